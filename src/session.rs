//! A reader's session: one pipeline plus the most recent result.
//!
//! Listening is a separate action from reading. A front end first submits
//! a document, shows the text, and only later (if the reader asks) turns
//! that same text into speech. [`Session::vocalize_last`] does this without
//! re-running extraction, interpretation or translation.
//!
//! Only the latest interpreted result is kept. A new submission replaces
//! it; a submission that fails or finds no text clears it, so audio is never
//! produced for a previous document.

use crate::artifact::UploadedArtifact;
use crate::config::PipelineConfig;
use crate::error::{AudioGenerationError, LexplainError};
use crate::explain::Pipeline;
use crate::output::{AudioArtifact, AudioOutcome, InterpretationOutput, PipelineOutcome};

pub struct Session {
    pipeline: Pipeline,
    last: Option<InterpretationOutput>,
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            last: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, LexplainError> {
        Ok(Self::new(Pipeline::from_config(config)?))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the pipeline and remember the result.
    pub async fn submit(
        &mut self,
        artifact: &UploadedArtifact,
        question: Option<&str>,
    ) -> Result<PipelineOutcome, LexplainError> {
        self.last = None;
        let outcome = self.pipeline.run(artifact, question).await?;
        self.last = outcome.output().cloned();
        Ok(outcome)
    }

    /// The most recent interpreted result, if any.
    pub fn last(&self) -> Option<&InterpretationOutput> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Speak the final text of the most recent result.
    ///
    /// The produced audio is also stored on that result. A failed attempt is
    /// stored only while no audio exists; it never replaces generated audio.
    pub async fn vocalize_last(&mut self) -> Result<AudioArtifact, AudioGenerationError> {
        let text = self
            .last
            .as_ref()
            .map(|o| o.final_text().to_string())
            .ok_or(AudioGenerationError::NothingToVocalize)?;

        let outcome = self.pipeline.vocalize_text(&text).await;
        let result = match &outcome {
            AudioOutcome::Generated(a) => Ok(a.clone()),
            AudioOutcome::Failed(e) => Err(e.clone()),
            AudioOutcome::NotRequested => Err(AudioGenerationError::NothingToVocalize),
        };
        if let Some(last) = self.last.as_mut() {
            if outcome.artifact().is_some() || last.audio.artifact().is_none() {
                last.audio = outcome;
            }
        }
        result
    }
}
