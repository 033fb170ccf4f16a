//! Interpretation: extracted text (+ optional question) → plain-language prose.
//!
//! ## Message Layout
//!
//! The request is an ordered list of parts:
//! 1. **Behavior contract**: [`BEHAVIOR_CONTRACT`], byte-for-byte, always first
//! 2. **Document**: the extracted text
//! 3. **Question** *(optional)*: the reader's question, when non-blank
//!
//! A response without text is a failure, never an empty success: an empty
//! explanation would be indistinguishable from "the document says nothing".

use crate::client::{GenerationOptions, GenerativeModel, Part};
use crate::config::PipelineConfig;
use crate::error::InterpretationServiceError;
use crate::output::{ExtractedText, Interpretation};
use crate::pipeline::postprocess;
use crate::prompts::{document_part, question_part, BEHAVIOR_CONTRACT};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Produces an [`Interpretation`] under the fixed behavior contract.
pub struct Interpreter {
    model: Arc<dyn GenerativeModel>,
    options: GenerationOptions,
}

impl Interpreter {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &PipelineConfig) -> Self {
        Self {
            model,
            options: GenerationOptions {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
        }
    }

    pub async fn interpret(
        &self,
        document: &ExtractedText,
        question: Option<&str>,
    ) -> Result<Interpretation, InterpretationServiceError> {
        if document.is_empty() {
            return Err(InterpretationServiceError::EmptyDocument);
        }

        let parts = build_request(&document.text, question);
        let start = Instant::now();

        let response = self
            .model
            .generate(&parts, &self.options)
            .await
            .map_err(|e| {
                warn!("{}: interpretation failed: {}", self.model.name(), e);
                InterpretationServiceError::Service(e)
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let text = response
            .text
            .as_deref()
            .map(postprocess::clean_text)
            .filter(|t| !t.is_empty())
            .ok_or(InterpretationServiceError::NoTextPayload)?;

        debug!(
            "{}: {:?} input tokens, {:?} output tokens",
            self.model.name(),
            response.input_tokens,
            response.output_tokens
        );
        info!("Interpretation: {} chars in {}ms", text.len(), duration_ms);

        Ok(Interpretation {
            text,
            duration_ms,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        })
    }
}

/// Assemble the ordered request parts.
pub fn build_request(document_text: &str, question: Option<&str>) -> Vec<Part> {
    let mut parts = vec![Part::text(BEHAVIOR_CONTRACT), Part::text(document_part(document_text))];
    if let Some(q) = question.filter(|q| !q.trim().is_empty()) {
        parts.push(Part::text(question_part(q)));
    }
    parts
}
