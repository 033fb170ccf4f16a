//! CLI binary for edgequake-lexplain.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig`, prints the explanation, and saves audio.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_lexplain::pipeline::input::default_output_path;
use edgequake_lexplain::{
    explain, write_audio, write_text, AudioOutcome, Language, MediaKind, PipelineConfig,
    PipelineOutcome, PipelineProgressCallback, ProgressCallback, Stage, Translation,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner whose message follows the
/// current stage, plus a log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .stage_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "Extracting text",
        Stage::Interpret => "Interpreting",
        Stage::Translate => "Translating",
        Stage::Vocalize => "Generating audio",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_pipeline_start(&self, kind: MediaKind) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Explaining {kind} document…"))
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut t) = self.stage_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_prefix(stage_label(stage));
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let unit = if stage == Stage::Vocalize { "bytes" } else { "chars" };
        self.bar.println(format!(
            "  {} {:<18} {:<14}  {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{output_len:>7} {unit}")),
            self.elapsed(),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let first_line = error.lines().next().unwrap_or(error);
        let msg = match first_line.char_indices().nth(79) {
            Some((i, _)) => format!("{}\u{2026}", &first_line[..i]),
            None => first_line.to_string(),
        };
        self.bar.println(format!(
            "  {} {:<18} {}  {}",
            red("✗"),
            stage_label(stage),
            red(&msg),
            self.elapsed(),
        ));
    }

    fn on_pipeline_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Explain a PDF (stdout)
  lexplain rental-agreement.pdf

  # Explain in Hindi and save the text
  lexplain -l hindi rental-agreement.pdf -o explanation.txt

  # Ask a question about the document
  lexplain notice.pdf --question "By when must I reply?"

  # Photo of a document, explained in Tamil, with audio
  lexplain -l ta scan.jpg --audio-out explanation.wav

  # From a URL, as JSON
  lexplain https://example.org/terms.pdf --json > result.json

LANGUAGES:
  English (en, default), Hindi (hi), Kannada (kn), Malayalam (ml),
  Tamil (ta), Telugu (te)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (interpretation, OCR, speech)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

NOTES:
  The explanation describes what the document says. It is not legal advice.
  Translation uses the free MyMemory service; if it is unavailable the
  English explanation is shown instead.
"#;

/// Explain legal documents in plain language.
#[derive(Parser, Debug)]
#[command(
    name = "lexplain",
    version,
    about = "Explain legal documents in plain language, optionally translated and spoken",
    long_about = "Explain a legal document (PDF, image, or text file; local path or URL) in plain \
language. The explanation covers only what the document says (obligations, rights, timelines, \
penalties and named parties) and never gives advice. It can be translated into an Indian \
language and saved as a WAV file.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path (PDF, PNG, JPEG, TXT) or HTTP/HTTPS URL.
    #[arg(required_unless_present = "list_languages")]
    input: Option<String>,

    /// A question to answer from the document.
    #[arg(long, env = "LEXPLAIN_QUESTION")]
    question: Option<String>,

    /// Language of the explanation: name or code (en, hi, kn, ml, ta, te).
    #[arg(short, long, env = "LEXPLAIN_LANGUAGE", default_value = "English")]
    language: Language,

    /// Write the explanation to this file instead of stdout.
    #[arg(short, long, env = "LEXPLAIN_OUTPUT")]
    output: Option<PathBuf>,

    /// Also generate speech and write it to this WAV file.
    #[arg(long, env = "LEXPLAIN_AUDIO_OUT")]
    audio_out: Option<PathBuf>,

    /// Generate speech next to the input as <name>.wav.
    #[arg(long, env = "LEXPLAIN_AUDIO", conflicts_with = "audio_out")]
    audio: bool,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "LEXPLAIN_JSON")]
    json: bool,

    /// Print the extracted document text before the explanation.
    #[arg(long, env = "LEXPLAIN_SHOW_EXTRACTED")]
    show_extracted: bool,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "LEXPLAIN_PROVIDER",
        long_help = "LLM provider for interpretation. Default: Gemini when GEMINI_API_KEY is set,\n\
          otherwise auto-detected from provider API key env vars."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-1.5-flash, gpt-4.1-nano).
    #[arg(long, env = "LEXPLAIN_MODEL")]
    model: Option<String>,

    /// Speech model ID.
    #[arg(long, env = "LEXPLAIN_SPEECH_MODEL")]
    speech_model: Option<String>,

    /// Prebuilt voice name.
    #[arg(long, env = "LEXPLAIN_VOICE", default_value = "Kore")]
    voice: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LEXPLAIN_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "LEXPLAIN_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Contact e-mail for the translation service's higher daily quota.
    #[arg(long, env = "LEXPLAIN_TRANSLATOR_EMAIL")]
    translator_email: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "LEXPLAIN_PASSWORD")]
    password: Option<String>,

    /// Per-request timeout for model, translation and speech calls, in seconds.
    #[arg(long, env = "LEXPLAIN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "LEXPLAIN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress spinner.
    #[arg(long, env = "LEXPLAIN_NO_PROGRESS")]
    no_progress: bool,

    /// List supported languages and exit.
    #[arg(long)]
    list_languages: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LEXPLAIN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LEXPLAIN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_languages {
        for lang in Language::ALL {
            println!("{:<10} {}", lang.name(), lang.code());
        }
        return Ok(());
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides all the feedback that matters; library INFO logs
    // would only interleave with it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let input = cli
        .input
        .clone()
        .context("An input file or URL is required")?;

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // Only PDFs need it; images and text files skip the download entirely.
    let needs_pdfium = !matches!(
        MediaKind::from_file_name(&input),
        Some(MediaKind::Image | MediaKind::PlainText)
    );
    if needs_pdfium {
        ensure_pdf_engine(cli.quiet)?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let audio_path = match (&cli.audio_out, cli.audio) {
        (Some(p), _) => Some(p.clone()),
        (None, true) => Some(default_output_path(&input, "wav")),
        (None, false) => None,
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, audio_path.is_some(), progress_cb)?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let outcome = explain(&input, cli.question.as_deref(), &config)
        .await
        .context("Interpretation failed")?;

    let output = match outcome {
        PipelineOutcome::NoReadableText { kind } => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to serialise output")?
                );
            }
            anyhow::bail!(
                "Could not extract readable text from this {kind}. Try a clearer file."
            );
        }
        PipelineOutcome::Interpreted(ref output) => output,
    };

    // ── Write results ────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let mut text = String::new();
        if cli.show_extracted {
            text.push_str("── Extracted text ──\n\n");
            text.push_str(&output.extracted.text);
            text.push_str("\n\n── Explanation ──\n\n");
        }
        text.push_str(output.final_text());
        if !text.ends_with('\n') {
            text.push('\n');
        }

        match cli.output {
            Some(ref path) => {
                write_text(&text, path)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
            }
        }
    }

    if let (Some(ref path), AudioOutcome::Generated(ref audio)) = (&audio_path, &output.audio) {
        write_audio(audio, path)
            .await
            .with_context(|| format!("Failed to write audio to {}", path.display()))?;
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        if let Translation::Fallback { ref suppressed, .. } = output.translation {
            eprintln!(
                "{} Translation to {} unavailable ({}); showing {}.",
                cyan("⚠"),
                cli.language,
                suppressed,
                config.source_language
            );
        }
        match (&output.audio, &audio_path) {
            (AudioOutcome::Generated(a), Some(path)) => eprintln!(
                "{} Audio  {:.1}s  →  {}",
                green("✔"),
                a.duration().as_secs_f64(),
                bold(&path.display().to_string())
            ),
            (AudioOutcome::Failed(e), _) => eprintln!("{} Audio not generated: {}", red("✘"), e),
            _ => {}
        }
        if let Some(ref path) = cli.output {
            eprintln!("{} Explanation  →  {}", green("✔"), bold(&path.display().to_string()));
        }
        let tokens = match (output.stats.input_tokens, output.stats.output_tokens) {
            (Some(i), Some(o)) => format!("{i} tokens in  /  {o} tokens out  |  "),
            _ => String::new(),
        };
        eprintln!("   {}", dim(&format!("{tokens}{}ms total", output.stats.total_duration_ms)));
    }

    Ok(())
}

/// Download or extract the pdfium library before the first PDF is opened.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    // With `--features bundled` the library was embedded at compile time and
    // only needs extracting. Otherwise the first run downloads it (~30 MB)
    // and later runs only check the cache path.
    #[cfg(feature = "bundled")]
    {
        let _ = quiet;
        tokio::task::block_in_place(pdfium_auto::ensure_pdfium_bundled)
            .context("Failed to extract bundled PDFium engine")?;
    }

    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if !quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.set_message("Connecting…");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        } else {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(
    cli: &Cli,
    vocalize: bool,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .target_language(cli.language)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .voice(cli.voice.clone())
        .vocalize(vocalize)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.speech_model {
        builder = builder.speech_model(model.clone());
    }
    if let Some(ref email) = cli.translator_email {
        builder = builder.translator_email(email.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
