//! Pipeline stages for document interpretation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets a
//! collaborator be swapped (e.g. a dedicated OCR service) without touching
//! the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ interpret ──▶ translate ──▶ vocalize
//! (path/URL) (pdfium/OCR) (contract)   (fail-soft)   (WAV)
//! ```
//!
//! 1. [`input`]    : turn a path or URL into an `UploadedArtifact`
//! 2. [`extract`]  : artifact → trimmed text; PDFs via `spawn_blocking`,
//!    images via [`encode`] and the generative model
//! 3. [`interpret`]: behavior contract + document (+ question) → prose,
//!    cleaned by [`postprocess`]
//! 4. [`translate`]: optional; any failure falls back to the original text
//! 5. [`vocalize`] : optional; PCM from the speech service framed as WAV

pub mod encode;
pub mod extract;
pub mod input;
pub mod interpret;
pub mod postprocess;
pub mod translate;
pub mod vocalize;

pub use extract::Extractor;
pub use interpret::Interpreter;
pub use translate::Translator;
pub use vocalize::Vocalizer;
