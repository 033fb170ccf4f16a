//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to be told when
//! each stage starts, finishes, or fails. The CLI uses it to drive a spinner;
//! a web front end could forward the same events over a socket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_lexplain::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, output_len: usize) {
//!         eprintln!("{stage} done ({output_len} bytes)");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::artifact::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Interpret,
    Translate,
    Vocalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Interpret => "interpret",
            Stage::Translate => "translate",
            Stage::Vocalize => "vocalize",
        })
    }
}

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// config holding them is shared across tasks.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before extraction starts.
    fn on_pipeline_start(&self, kind: MediaKind) {
        let _ = kind;
    }

    /// Called just before a stage calls its collaborator.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage produced its output.
    ///
    /// `output_len` is the byte length of the produced text or audio buffer.
    /// A translation that fell back to the original text still completes.
    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called when a stage fails.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once when the request ends, successfully or not.
    fn on_pipeline_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }

        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.events.lock().unwrap().push(format!("error:{stage}:{error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_pipeline_start(MediaKind::Pdf);
        cb.on_stage_start(Stage::Extract);
        cb.on_stage_complete(Stage::Extract, 12);
        cb.on_stage_error(Stage::Vocalize, "no audio");
        cb.on_pipeline_complete(true);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Interpret);
        rec.on_stage_complete(Stage::Interpret, 10);
        rec.on_stage_error(Stage::Translate, "quota");
        let events = rec.events.lock().unwrap();
        assert_eq!(*events, vec!["start:interpret", "error:translate:quota"]);
    }

    #[test]
    fn stage_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Stage::Vocalize).unwrap(), "\"vocalize\"");
    }
}
