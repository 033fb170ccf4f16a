//! # edgequake-lexplain
//!
//! Explain legal documents in plain language, optionally translated and spoken.
//!
//! ## Why this crate?
//!
//! Leases, notices and contracts are written for lawyers. This crate takes
//! the uploaded document (a PDF, a photo, or plain text), pulls out its
//! text, and asks a language model to restate it under a fixed contract:
//! explain only what the document says, bring in no outside law, and never
//! give advice. The explanation can then be translated into an Indian
//! language and turned into a WAV file for readers who prefer to listen.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Artifact (PDF / image / text)
//!  │
//!  ├─ 1. Extract    pdfium text layer, model-based OCR, or UTF-8 decode
//!  ├─ 2. Interpret  behavior contract + document (+ question) → prose
//!  ├─ 3. Translate  MyMemory; on any failure keep the original text
//!  └─ 4. Vocalize   Gemini speech → 16-bit PCM → WAV (optional)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_lexplain::{explain, Language, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Interpretation via GEMINI_API_KEY (or OPENAI_API_KEY / ANTHROPIC_API_KEY)
//!     let config = PipelineConfig::builder()
//!         .target_language(Language::Hindi)
//!         .build()?;
//!     let outcome = explain("rental-agreement.pdf", None, &config).await?;
//!     match outcome.output() {
//!         Some(out) => println!("{}", out.final_text()),
//!         None => eprintln!("Could not extract readable text. Try a clearer file."),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `lexplain` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium shared library at build time |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-lexplain = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod explain;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{MediaKind, UploadedArtifact};
pub use client::{
    GenerateResponse, GenerationOptions, GenerativeModel, InlineAudio, Part, PdfTextSource,
    SpeechResponse, SpeechSynthesizer, TranslationService,
};
pub use config::{Language, PipelineConfig, PipelineConfigBuilder};
pub use error::{
    AudioGenerationError, ClientError, ExtractionError, InterpretationServiceError, LexplainError,
};
pub use explain::{
    explain, explain_bytes, explain_sync, explain_to_file, write_audio, write_text, Pipeline,
};
pub use output::{
    AudioArtifact, AudioOutcome, ExtractedText, Interpretation, InterpretationOutput,
    PipelineOutcome, PipelineStats, Translation,
};
pub use pipeline::input::resolve_input;
pub use pipeline::{Extractor, Interpreter, Translator, Vocalizer};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use session::Session;
