//! Stage composition and the top-level entry points.
//!
//! [`Pipeline`] owns one instance of each stage and runs them strictly in
//! order: extract → interpret → translate → (optional) vocalize. Each stage
//! is awaited before the next begins; nothing runs concurrently.
//!
//! Failure handling differs per stage:
//!
//! | Stage     | On failure |
//! |-----------|------------|
//! | Extract   | fatal: `Err(LexplainError::Extraction)` |
//! | Interpret | fatal: `Err(LexplainError::Interpretation)`, later stages never run |
//! | Translate | never fails: original text in `Translation::Fallback` |
//! | Vocalize  | text kept: `AudioOutcome::Failed` |

use crate::artifact::{MediaKind, UploadedArtifact};
use crate::client::gemini::GeminiClient;
use crate::client::llm::LlmProviderModel;
use crate::client::mymemory::MyMemoryTranslator;
use crate::client::pdfium::PdfiumTextSource;
use crate::client::{GenerativeModel, PdfTextSource, SpeechSynthesizer, TranslationService};
use crate::config::{Language, PipelineConfig, DEFAULT_PROVIDER_MODEL};
use crate::error::{ClientError, LexplainError};
use crate::output::{AudioArtifact, AudioOutcome, InterpretationOutput, PipelineOutcome, PipelineStats};
use crate::pipeline::{input, Extractor, Interpreter, Translator, Vocalizer};
use crate::progress::{PipelineProgressCallback, ProgressCallback, Stage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The four stages, built once from a [`PipelineConfig`].
pub struct Pipeline {
    extractor: Extractor,
    interpreter: Interpreter,
    translator: Translator,
    vocalizer: Vocalizer,
    source_language: Language,
    target_language: Language,
    vocalize: bool,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    /// Build a pipeline, resolving every collaborator from the config and
    /// the environment.
    ///
    /// Interpretation (and image text recognition) uses, in order:
    /// 1. `config.model_client`
    /// 2. `config.provider_name` through edgequake-llm
    /// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
    /// 4. Gemini, when the variable named by `config.api_key_env` is set
    /// 5. edgequake-llm auto-detection from provider API keys
    pub fn from_config(config: &PipelineConfig) -> Result<Self, LexplainError> {
        let model = resolve_model(config)?;
        let translator = resolve_translator(config)?;
        let speech = resolve_speech(config)?;
        Ok(Self::with_clients(
            config,
            Arc::new(PdfiumTextSource::new()),
            model,
            translator,
            speech,
        ))
    }

    /// Build a pipeline from explicit collaborators.
    pub fn with_clients(
        config: &PipelineConfig,
        pdf: Arc<dyn PdfTextSource>,
        model: Arc<dyn GenerativeModel>,
        translator: Arc<dyn TranslationService>,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        Self {
            extractor: Extractor::new(pdf, Arc::clone(&model), config),
            interpreter: Interpreter::new(model, config),
            translator: Translator::new(translator, config),
            vocalizer: Vocalizer::new(speech, config),
            source_language: config.source_language,
            target_language: config.target_language,
            vocalize: config.vocalize,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn vocalizer(&self) -> &Vocalizer {
        &self.vocalizer
    }

    fn notify(&self, event: impl FnOnce(&dyn PipelineProgressCallback)) {
        if let Some(ref cb) = self.progress {
            event(cb.as_ref());
        }
    }

    /// Run every stage for one uploaded artifact.
    ///
    /// # Returns
    /// `Ok(PipelineOutcome::NoReadableText)` when extraction found no text,
    /// `Ok(PipelineOutcome::Interpreted)` otherwise. Translation and audio
    /// problems are reported inside the output, not as errors.
    ///
    /// # Errors
    /// Extraction and interpretation failures.
    pub async fn run(
        &self,
        artifact: &UploadedArtifact,
        question: Option<&str>,
    ) -> Result<PipelineOutcome, LexplainError> {
        let total_start = Instant::now();
        info!("Starting interpretation of {} ({} bytes)", artifact.kind(), artifact.len());
        self.notify(|cb| cb.on_pipeline_start(artifact.kind()));

        // ── Step 1: Extract ──────────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Extract));
        let extract_start = Instant::now();
        let extracted = match self.extractor.extract(artifact).await {
            Ok(e) => e,
            Err(e) => return Err(self.fail(Stage::Extract, e.into())),
        };
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        self.notify(|cb| cb.on_stage_complete(Stage::Extract, extracted.text.len()));

        if extracted.is_empty() {
            info!("No readable text in {}", artifact.kind());
            self.notify(|cb| cb.on_pipeline_complete(true));
            return Ok(PipelineOutcome::NoReadableText {
                kind: artifact.kind(),
            });
        }

        // ── Step 2: Interpret ────────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Interpret));
        let interpretation = match self.interpreter.interpret(&extracted, question).await {
            Ok(i) => i,
            Err(e) => return Err(self.fail(Stage::Interpret, e.into())),
        };
        self.notify(|cb| cb.on_stage_complete(Stage::Interpret, interpretation.text.len()));

        // ── Step 3: Translate ────────────────────────────────────────────
        self.notify(|cb| cb.on_stage_start(Stage::Translate));
        let translate_start = Instant::now();
        let translation = self
            .translator
            .translate(&interpretation.text, self.source_language, self.target_language)
            .await;
        let translate_duration_ms = translate_start.elapsed().as_millis() as u64;
        self.notify(|cb| cb.on_stage_complete(Stage::Translate, translation.text().len()));

        // ── Step 4: Vocalize (optional) ──────────────────────────────────
        let vocalize_start = Instant::now();
        let audio = if self.vocalize {
            self.vocalize_text(translation.text()).await
        } else {
            AudioOutcome::NotRequested
        };
        let vocalize_duration_ms = vocalize_start.elapsed().as_millis() as u64;

        let stats = PipelineStats {
            extract_duration_ms,
            interpret_duration_ms: interpretation.duration_ms,
            translate_duration_ms,
            vocalize_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
            input_tokens: interpretation.input_tokens,
            output_tokens: interpretation.output_tokens,
        };

        info!("Interpretation complete in {}ms", stats.total_duration_ms);
        self.notify(|cb| cb.on_pipeline_complete(true));

        Ok(PipelineOutcome::Interpreted(Box::new(InterpretationOutput {
            extracted,
            question: question.map(str::to_string).filter(|q| !q.trim().is_empty()),
            interpretation,
            translation,
            audio,
            stats,
        })))
    }

    /// Run only the vocalizer, reporting progress like [`Pipeline::run`] does.
    pub async fn vocalize_text(&self, text: &str) -> AudioOutcome {
        self.notify(|cb| cb.on_stage_start(Stage::Vocalize));
        match self.vocalizer.vocalize(text).await {
            Ok(artifact) => {
                self.notify(|cb| cb.on_stage_complete(Stage::Vocalize, artifact.wav.len()));
                AudioOutcome::Generated(artifact)
            }
            Err(e) => {
                warn!("Audio generation failed, keeping text result: {}", e);
                self.notify(|cb| cb.on_stage_error(Stage::Vocalize, &e.to_string()));
                AudioOutcome::Failed(e)
            }
        }
    }

    fn fail(&self, stage: Stage, error: LexplainError) -> LexplainError {
        warn!("{} stage failed: {}", stage, error);
        self.notify(|cb| {
            cb.on_stage_error(stage, &error.to_string());
            cb.on_pipeline_complete(false);
        });
        error
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Interpret a local document or an HTTP/HTTPS URL.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use edgequake_lexplain::{explain, Language, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Interpretation via GEMINI_API_KEY, or any edgequake-llm provider key
/// let config = PipelineConfig::builder()
///     .target_language(Language::Tamil)
///     .build()?;
/// let outcome = explain("lease.pdf", Some("When can the landlord enter?"), &config).await?;
/// if let Some(out) = outcome.output() {
///     println!("{}", out.final_text());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn explain(
    input_str: impl AsRef<str>,
    question: Option<&str>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, LexplainError> {
    let artifact = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let pipeline = Pipeline::from_config(config)?;
    pipeline.run(&artifact, question).await
}

/// Interpret an in-memory document of a known kind.
///
/// The recommended API when the document comes from an upload handler,
/// a database, or a message queue rather than the file system.
pub async fn explain_bytes(
    bytes: impl Into<Vec<u8>>,
    kind: MediaKind,
    question: Option<&str>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, LexplainError> {
    let artifact = UploadedArtifact::new(bytes, kind);
    let pipeline = Pipeline::from_config(config)?;
    pipeline.run(&artifact, question).await
}

/// Synchronous wrapper around [`explain`].
///
/// Creates a temporary tokio runtime internally.
pub fn explain_sync(
    input_str: impl AsRef<str>,
    question: Option<&str>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, LexplainError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LexplainError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(explain(input_str, question, config))
}

/// Interpret a document and write the final text to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files. Nothing
/// is written when the document had no readable text.
pub async fn explain_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    question: Option<&str>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, LexplainError> {
    let outcome = explain(input_str, question, config).await?;
    if let Some(output) = outcome.output() {
        write_text(output.final_text(), output_path).await?;
    }
    Ok(outcome)
}

/// Write text to disk atomically, ending it with a newline.
pub async fn write_text(text: &str, path: impl AsRef<Path>) -> Result<(), LexplainError> {
    let mut text = text.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    write_atomic(path.as_ref(), text.as_bytes()).await
}

/// Write a WAV artifact to disk atomically.
pub async fn write_audio(audio: &AudioArtifact, path: impl AsRef<Path>) -> Result<(), LexplainError> {
    write_atomic(path.as_ref(), &audio.wav).await
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LexplainError> {
    let write_failed = |e: std::io::Error| LexplainError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Collaborator resolution ──────────────────────────────────────────────

fn not_configured(e: ClientError) -> LexplainError {
    match e {
        ClientError::NotConfigured { service, hint } => LexplainError::ProviderNotConfigured {
            provider: service,
            hint,
        },
        other => LexplainError::Internal(other.to_string()),
    }
}

fn resolve_model(config: &PipelineConfig) -> Result<Arc<dyn GenerativeModel>, LexplainError> {
    // 1) User-provided client takes priority
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
        debug!("Using edgequake-llm provider {} ({})", name, model);
        return Ok(Arc::new(LlmProviderModel::from_name(name, model).map_err(not_configured)?));
    }

    // 3) Provider pair from the environment
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return Ok(Arc::new(LlmProviderModel::from_name(&prov, &model).map_err(not_configured)?));
        }
    }

    // 4) Gemini key
    if config.api_key().is_some() {
        let client = GeminiClient::from_config(config).map_err(not_configured)?;
        debug!("Using Gemini ({})", client.model());
        return Ok(Arc::new(client));
    }

    // 5) Whatever edgequake-llm can find
    Ok(Arc::new(LlmProviderModel::from_env().map_err(|e| match e {
        ClientError::NotConfigured { hint, .. } => LexplainError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!("{} is not set either.\n{}", config.api_key_env, hint),
        },
        other => LexplainError::Internal(other.to_string()),
    })?))
}

fn resolve_translator(
    config: &PipelineConfig,
) -> Result<Arc<dyn TranslationService>, LexplainError> {
    if let Some(ref t) = config.translator {
        return Ok(Arc::clone(t));
    }
    let client = MyMemoryTranslator::new(config.api_timeout_secs, config.translator_email.clone())
        .map_err(|e| LexplainError::Internal(e.to_string()))?;
    Ok(Arc::new(client))
}

fn resolve_speech(
    config: &PipelineConfig,
) -> Result<Option<Arc<dyn SpeechSynthesizer>>, LexplainError> {
    if let Some(ref s) = config.speech {
        return Ok(Some(Arc::clone(s)));
    }
    if config.api_key().is_none() {
        if config.vocalize {
            warn!(
                "Audio requested but {} is not set; vocalization will fail",
                config.api_key_env
            );
        }
        return Ok(None);
    }
    let client = GeminiClient::from_config(config).map_err(not_configured)?;
    Ok(Some(Arc::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn atomic_write_creates_parent_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/result.txt");
        write_atomic(&path, b"hello").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!dir.path().join("out/nested/result.txt.tmp").exists());
    }

    #[tokio::test]
    async fn write_text_replaces_file_and_ends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explanation.txt");
        std::fs::write(&path, "an older, much longer explanation").unwrap();

        write_text("Rent is due monthly.", &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Rent is due monthly.\n");
        assert!(!dir.path().join("explanation.txt.tmp").exists());

        write_text("Already terminated.\n", &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Already terminated.\n");
    }

    #[test]
    fn not_configured_maps_to_provider_error() {
        let e = not_configured(ClientError::NotConfigured {
            service: "gemini".into(),
            hint: "set GEMINI_API_KEY".into(),
        });
        assert!(matches!(e, LexplainError::ProviderNotConfigured { ref provider, .. } if provider == "gemini"));
    }

    #[test]
    fn explicit_clients_win_over_environment() {
        struct Silent;
        #[async_trait::async_trait]
        impl TranslationService for Silent {
            fn name(&self) -> &str {
                "silent"
            }
            async fn translate(&self, t: &str, _: Language, _: Language) -> Result<String, ClientError> {
                Ok(t.to_string())
            }
        }
        let config = PipelineConfig::builder()
            .translator(Arc::new(Silent))
            .api_key_env("LEXPLAIN_TEST_KEY_THAT_IS_NEVER_SET")
            .build()
            .unwrap();
        assert_eq!(resolve_translator(&config).unwrap().name(), "silent");
        assert!(resolve_speech(&config).unwrap().is_none());
    }
}
