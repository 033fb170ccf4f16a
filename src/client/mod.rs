//! External collaborators and the typed payloads exchanged with them.
//!
//! Each pipeline stage talks to exactly one trait defined here. The traits
//! are deliberately narrow so tests can substitute an in-memory fake and so
//! a different vendor only needs one new `impl`.
//!
//! | Trait | Used by | Default implementation |
//! |-------|---------|------------------------|
//! | [`PdfTextSource`]      | Extractor (PDF)        | [`pdfium::PdfiumTextSource`] |
//! | [`GenerativeModel`]    | Interpreter, Extractor (image) | [`gemini::GeminiClient`], [`llm::LlmProviderModel`] |
//! | [`TranslationService`] | Translator             | [`mymemory::MyMemoryTranslator`] |
//! | [`SpeechSynthesizer`]  | Vocalizer              | [`gemini::GeminiClient`] |

pub mod gemini;
pub mod llm;
pub mod mymemory;
pub mod pdfium;

use crate::config::Language;
use crate::error::{ClientError, ExtractionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One piece of a multimodal request.
///
/// Binary parts carry raw bytes; clients base64-encode them at the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Image { mime_type: String, data: Vec<u8> },
    Audio { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn png(data: Vec<u8>) -> Self {
        Part::Image {
            mime_type: "image/png".to_string(),
            data,
        }
    }

    /// The text of a `Text` part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Options forwarded to the generative model on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// A model response. `text` is `None` when the service returned content
/// without any textual part (blocked, empty candidates, audio only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl GenerateResponse {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Inline audio returned by a speech service, already base64-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAudio {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A speech-synthesis response. `audio` is `None` when no inline audio came back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechResponse {
    pub audio: Option<InlineAudio>,
}

/// Language-understanding service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        parts: &[Part],
        options: &GenerationOptions,
    ) -> Result<GenerateResponse, ClientError>;
}

/// Machine-translation service.
#[async_trait]
pub trait TranslationService: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ClientError>;
}

/// Text-to-speech service returning 16-bit linear PCM.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str, voice: &str) -> Result<SpeechResponse, ClientError>;
}

/// Per-page text extraction for PDFs.
///
/// Blocking; the extractor calls it from `spawn_blocking`. Each entry is one
/// page in document order, `None` when that page yielded nothing.
pub trait PdfTextSource: Send + Sync {
    fn page_texts(
        &self,
        pdf: &[u8],
        password: Option<&str>,
    ) -> Result<Vec<Option<String>>, ExtractionError>;
}
