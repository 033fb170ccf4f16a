//! The uploaded document and its declared media kind.
//!
//! An [`UploadedArtifact`] is caller-owned and immutable; the pipeline only
//! ever borrows it. The media kind decides which extraction path runs, so
//! every constructor either receives the kind explicitly or derives it from
//! a MIME type, a file extension, or the leading bytes.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of document an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    Pdf,
    Image,
    PlainText,
}

impl MediaKind {
    /// Map a MIME type (parameters ignored) to a media kind.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(MediaKind::Pdf),
            "text/plain" => Some(MediaKind::PlainText),
            e if e.starts_with("image/") => Some(MediaKind::Image),
            _ => None,
        }
    }

    /// Map a file name's extension to a media kind.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(MediaKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(MediaKind::Image),
            "txt" | "text" => Some(MediaKind::PlainText),
            _ => None,
        }
    }

    /// Guess the media kind from content.
    ///
    /// `%PDF` wins, then any header the `image` crate recognises, then
    /// well-formed UTF-8.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(MediaKind::Pdf)
        } else if image::guess_format(bytes).is_ok() {
            Some(MediaKind::Image)
        } else if !bytes.is_empty() && std::str::from_utf8(bytes).is_ok() {
            Some(MediaKind::PlainText)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Pdf => "pdf",
            MediaKind::Image => "image",
            MediaKind::PlainText => "plain-text",
        })
    }
}

/// An uploaded document: raw bytes plus the kind they were declared as.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    bytes: Vec<u8>,
    kind: MediaKind,
    name: Option<String>,
}

impl UploadedArtifact {
    pub fn new(bytes: impl Into<Vec<u8>>, kind: MediaKind) -> Self {
        Self {
            bytes: bytes.into(),
            kind,
            name: None,
        }
    }

    /// Build from bytes and an uploader-declared MIME type.
    pub fn from_mime(bytes: impl Into<Vec<u8>>, mime: &str) -> Result<Self, ExtractionError> {
        let kind = MediaKind::from_mime(mime).ok_or_else(|| ExtractionError::UnsupportedMediaKind {
            detail: format!("MIME type '{mime}'"),
        })?;
        Ok(Self::new(bytes, kind))
    }

    /// Build from bytes and a file name; falls back to content sniffing
    /// when the extension is missing or unknown.
    pub fn from_file_name(
        bytes: impl Into<Vec<u8>>,
        name: impl Into<String>,
    ) -> Result<Self, ExtractionError> {
        let name = name.into();
        let bytes = bytes.into();
        let kind = MediaKind::from_file_name(&name)
            .or_else(|| MediaKind::sniff(&bytes))
            .ok_or_else(|| ExtractionError::UnsupportedMediaKind {
                detail: format!("cannot tell what '{name}' contains"),
            })?;
        Ok(Self {
            bytes,
            kind,
            name: Some(name),
        })
    }

    /// Build from bytes alone by sniffing the content.
    pub fn sniff(bytes: impl Into<Vec<u8>>) -> Result<Self, ExtractionError> {
        let bytes = bytes.into();
        let kind = MediaKind::sniff(&bytes).ok_or_else(|| ExtractionError::UnsupportedMediaKind {
            detail: "content is not a PDF, a known image format, or UTF-8 text".into(),
        })?;
        Ok(Self::new(bytes, kind))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedArtifact")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}
