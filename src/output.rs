//! Values produced by the pipeline stages.
//!
//! Every stage returns a fresh value; nothing here is mutated after
//! construction. All types are `Serialize` so the CLI can print them with
//! `--json`. Audio bytes are skipped in JSON; use
//! [`crate::explain::write_audio`] to save them.

use crate::artifact::MediaKind;
use crate::config::Language;
use crate::error::{AudioGenerationError, ClientError};
use serde::Serialize;
use std::time::Duration;

/// Text pulled out of an uploaded artifact, already trimmed.
///
/// An empty `text` means "no readable content"; the pipeline stops there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub kind: MediaKind,
    /// Total pages in the PDF. `None` for images and plain text.
    pub page_count: Option<usize>,
    /// Pages that contributed non-blank text. `None` for images and plain text.
    pub pages_with_text: Option<usize>,
}

impl ExtractedText {
    pub fn new(text: impl AsRef<str>, kind: MediaKind) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            kind,
            page_count: None,
            pages_with_text: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A plain-language explanation from the interpretation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpretation {
    pub text: String,
    /// Wall-clock time of the service call.
    pub duration_ms: u64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Result of the translation step.
///
/// Translation never fails the request: [`Translation::Fallback`] carries the
/// original text together with the error that was swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Translation {
    /// Source and target language matched, or there was nothing to translate.
    Unchanged { text: String },
    Translated { text: String, target: Language },
    /// The service failed; `text` is the untranslated input.
    Fallback {
        text: String,
        suppressed: ClientError,
    },
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Translation::Unchanged { text }
            | Translation::Translated { text, .. }
            | Translation::Fallback { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Translation::Unchanged { text }
            | Translation::Translated { text, .. }
            | Translation::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Translation::Fallback { .. })
    }
}

/// A complete RIFF/WAVE file: mono, 16-bit linear PCM.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    #[serde(skip)]
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel.
    pub sample_count: usize,
}

impl AudioArtifact {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.sample_count as u128 * 1_000_000_000 / self.sample_rate as u128;
        Duration::from_nanos(nanos as u64)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.wav
    }
}

impl std::fmt::Debug for AudioArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArtifact")
            .field("len", &self.wav.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("sample_count", &self.sample_count)
            .finish()
    }
}

/// Result of the optional vocalization step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AudioOutcome {
    NotRequested,
    Generated(AudioArtifact),
    /// Only audio failed; the text result is unaffected.
    Failed(AudioGenerationError),
}

impl AudioOutcome {
    pub fn artifact(&self) -> Option<&AudioArtifact> {
        match self {
            AudioOutcome::Generated(a) => Some(a),
            _ => None,
        }
    }
}

/// Timing and token statistics for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub extract_duration_ms: u64,
    pub interpret_duration_ms: u64,
    pub translate_duration_ms: u64,
    pub vocalize_duration_ms: u64,
    pub total_duration_ms: u64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Everything produced for a document that had readable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpretationOutput {
    pub extracted: ExtractedText,
    pub question: Option<String>,
    pub interpretation: Interpretation,
    pub translation: Translation,
    pub audio: AudioOutcome,
    pub stats: PipelineStats,
}

impl InterpretationOutput {
    /// The text the reader should see: translated when possible.
    pub fn final_text(&self) -> &str {
        self.translation.text()
    }
}

/// Successful end of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Extraction produced no text; nothing was interpreted.
    NoReadableText { kind: MediaKind },
    Interpreted(Box<InterpretationOutput>),
}

impl PipelineOutcome {
    pub fn output(&self) -> Option<&InterpretationOutput> {
        match self {
            PipelineOutcome::Interpreted(o) => Some(o),
            PipelineOutcome::NoReadableText { .. } => None,
        }
    }

    pub fn into_output(self) -> Option<InterpretationOutput> {
        match self {
            PipelineOutcome::Interpreted(o) => Some(*o),
            PipelineOutcome::NoReadableText { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_text_is_trimmed() {
        let e = ExtractedText::new("  \n Clause 1.\n\n", MediaKind::PlainText);
        assert_eq!(e.text, "Clause 1.");
        assert!(ExtractedText::new(" \t\n", MediaKind::Pdf).is_empty());
    }

    #[test]
    fn translation_text_accessor_is_uniform() {
        let fallback = Translation::Fallback {
            text: "original".into(),
            suppressed: ClientError::Timeout {
                service: "mymemory".into(),
                secs: 60,
            },
        };
        assert_eq!(fallback.text(), "original");
        assert!(fallback.is_fallback());
        let translated = Translation::Translated {
            text: "अनुवाद".into(),
            target: Language::Hindi,
        };
        assert_eq!(translated.into_text(), "अनुवाद");
    }

    #[test]
    fn audio_duration() {
        let a = AudioArtifact {
            wav: vec![],
            sample_rate: 24_000,
            channels: 1,
            sample_count: 36_000,
        };
        assert_eq!(a.duration(), Duration::from_millis(1500));
    }

    #[test]
    fn outcome_json_skips_audio_bytes() {
        let outcome = AudioOutcome::Generated(AudioArtifact {
            wav: vec![1; 64],
            sample_rate: 24_000,
            channels: 1,
            sample_count: 10,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "generated");
        assert_eq!(json["detail"]["sample_rate"], 24_000);
        assert!(json["detail"].get("wav").is_none());
    }

    #[test]
    fn no_readable_text_json() {
        let json = serde_json::to_value(PipelineOutcome::NoReadableText {
            kind: MediaKind::Image,
        })
        .unwrap();
        assert_eq!(json["outcome"], "no_readable_text");
        assert_eq!(json["kind"], "image");
    }
}
