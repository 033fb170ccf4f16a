//! Error types for the edgequake-lexplain library.
//!
//! Failures are split by how far they reach:
//!
//! * [`LexplainError`] is **fatal**: the request cannot produce an
//!   interpretation (bad input, unreadable document, interpretation service
//!   down). Returned as `Err(LexplainError)` from the top-level `explain*`
//!   functions and from [`crate::Pipeline::run`].
//!
//! * [`ExtractionError`], [`InterpretationServiceError`]: the two stage
//!   errors that end a request. Both convert into [`LexplainError`] with `?`.
//!
//! * [`AudioGenerationError`] is **non-fatal**: only the vocalization step
//!   fails. Stored in [`crate::output::AudioOutcome::Failed`] next to the
//!   already-produced text.
//!
//! * [`ClientError`]: transport-level taxonomy shared by every collaborator
//!   client. Translation failures are plain `ClientError`s that the
//!   translator swallows into [`crate::output::Translation::Fallback`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-lexplain library.
#[derive(Debug, Error)]
pub enum LexplainError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// The uploaded artifact could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The interpretation service failed or returned no usable text.
    #[error(transparent)]
    Interpretation(#[from] InterpretationServiceError),

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("Provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport-level failure reported by a collaborator client.
///
/// Kept `Clone + Serialize` so it can travel inside step outcomes
/// (suppressed translation errors, failed audio) and the CLI's JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("{service}: request failed: {detail}")]
    Request { service: String, detail: String },

    /// The client-side timeout elapsed.
    #[error("{service}: request timed out after {secs}s")]
    Timeout { service: String, secs: u64 },

    /// HTTP 429.
    #[error("{service}: rate limit exceeded")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    /// HTTP 401/403.
    #[error("{service}: authentication failed: {detail}")]
    Auth { service: String, detail: String },

    /// Any other non-success HTTP status, or an error object in the body.
    #[error("{service}: API error ({status}): {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    /// The body could not be decoded into the expected shape.
    #[error("{service}: malformed response: {detail}")]
    MalformedResponse { service: String, detail: String },

    /// The collaborator cannot carry the requested payload.
    #[error("{service}: unsupported request: {detail}")]
    Unsupported { service: String, detail: String },

    /// The collaborator has no credentials or endpoint.
    #[error("{service} is not configured: {hint}")]
    NotConfigured { service: String, hint: String },
}

impl ClientError {
    /// Classify a `reqwest` transport error.
    pub(crate) fn from_reqwest(service: &str, timeout_secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout {
                service: service.to_string(),
                secs: timeout_secs,
            }
        } else if e.is_decode() {
            ClientError::MalformedResponse {
                service: service.to_string(),
                detail: e.to_string(),
            }
        } else {
            ClientError::Request {
                service: service.to_string(),
                detail: e.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status.
    pub(crate) fn from_status(
        service: &str,
        status: reqwest::StatusCode,
        retry_after_secs: Option<u64>,
        body: String,
    ) -> Self {
        match status.as_u16() {
            429 => ClientError::RateLimited {
                service: service.to_string(),
                retry_after_secs,
            },
            401 | 403 => ClientError::Auth {
                service: service.to_string(),
                detail: body,
            },
            code => ClientError::Api {
                service: service.to_string(),
                status: code,
                message: body,
            },
        }
    }
}

/// The artifact could not be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// Declared media type is not PDF, image or plain text.
    #[error("Unsupported media kind: {detail}")]
    UnsupportedMediaKind { detail: String },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// The pdfium library could not be loaded.
    #[error(
        "PDF engine unavailable: {detail}\n\n\
PDFium is normally downloaded automatically on first run.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfEngineUnavailable { detail: String },

    /// The image bytes could not be decoded.
    #[error("Unreadable image: {detail}")]
    UnreadableImage { detail: String },

    /// Plain-text artifact is not valid UTF-8.
    #[error("Text document is not valid UTF-8: {detail}")]
    InvalidUtf8 { detail: String },

    /// The text-recognition call for an image failed.
    #[error("Text recognition failed: {0}")]
    Ocr(ClientError),

    /// The blocking extraction task died.
    #[error("Extraction task failed: {detail}")]
    Task { detail: String },
}

/// The interpretation service was unavailable or returned nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InterpretationServiceError {
    /// Nothing to interpret; the caller should have reported "no content".
    #[error("Refusing to interpret an empty document")]
    EmptyDocument,

    /// Transport, quota, auth or decoding failure.
    #[error("Interpretation service error: {0}")]
    Service(#[from] ClientError),

    /// The service answered, but without a textual payload.
    #[error("Interpretation service returned no text")]
    NoTextPayload,
}

/// Vocalization failed; the text result is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AudioGenerationError {
    /// No speech collaborator is available.
    #[error("Speech synthesis is not configured: {hint}")]
    NotConfigured { hint: String },

    /// Nothing to speak.
    #[error("Refusing to vocalize empty text")]
    EmptyText,

    /// A session was asked to vocalize before any interpretation succeeded.
    #[error("No interpretation available to vocalize")]
    NothingToVocalize,

    /// Transport, quota, auth or decoding failure.
    #[error("Speech service error: {0}")]
    Service(#[from] ClientError),

    /// The response carried no inline audio.
    #[error("Speech service returned no audio payload")]
    NoAudioPayload,

    /// Inline audio was present but not 16-bit linear PCM at the configured rate.
    #[error("Unexpected audio encoding '{mime_type}' (expected 16-bit linear PCM at {expected_rate} Hz)")]
    UnexpectedEncoding {
        mime_type: String,
        expected_rate: u32,
    },

    /// 16-bit samples need an even number of bytes.
    #[error("PCM buffer has an odd length of {len} bytes")]
    OddSampleBuffer { len: usize },

    /// The WAV writer rejected the samples.
    #[error("WAV framing failed: {detail}")]
    Framing { detail: String },
}
