//! Extraction: uploaded artifact → trimmed UTF-8 text.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, so the Tokio worker threads
//! never stall while a long PDF is parsed.
//!
//! ## Images
//!
//! Images have no text layer. They are normalised to PNG locally and sent to
//! the same generative model that interprets documents, with a fixed
//! "extract all visible text" instruction. That path lives in
//! [`Extractor::extract_image`] alone so a dedicated OCR service can replace
//! it without touching the other media kinds.

use crate::artifact::{MediaKind, UploadedArtifact};
use crate::client::{GenerationOptions, GenerativeModel, Part, PdfTextSource};
use crate::config::PipelineConfig;
use crate::error::ExtractionError;
use crate::output::ExtractedText;
use crate::pipeline::{encode, postprocess};
use crate::prompts::OCR_INSTRUCTION;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns an [`UploadedArtifact`] into [`ExtractedText`].
pub struct Extractor {
    pdf: Arc<dyn PdfTextSource>,
    ocr: Arc<dyn GenerativeModel>,
    options: GenerationOptions,
    password: Option<String>,
    max_image_pixels: u32,
}

impl Extractor {
    pub fn new(
        pdf: Arc<dyn PdfTextSource>,
        ocr: Arc<dyn GenerativeModel>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            pdf,
            ocr,
            options: GenerationOptions {
                temperature: 0.0,
                max_tokens: config.max_tokens,
            },
            password: config.password.clone(),
            max_image_pixels: config.max_image_pixels,
        }
    }

    /// Extract text according to the artifact's media kind.
    ///
    /// Returns an empty [`ExtractedText`] when the artifact holds no readable
    /// content; that is an outcome, not an error.
    pub async fn extract(&self, artifact: &UploadedArtifact) -> Result<ExtractedText, ExtractionError> {
        let extracted = match artifact.kind() {
            MediaKind::Pdf => self.extract_pdf(artifact.bytes()).await?,
            MediaKind::Image => self.extract_image(artifact.bytes()).await?,
            MediaKind::PlainText => extract_plain_text(artifact.bytes())?,
        };
        info!(
            "Extracted {} chars from {}",
            extracted.text.chars().count(),
            artifact.kind()
        );
        Ok(extracted)
    }

    async fn extract_pdf(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let source = Arc::clone(&self.pdf);
        let bytes = bytes.to_vec();
        let password = self.password.clone();

        let pages = tokio::task::spawn_blocking(move || {
            source.page_texts(&bytes, password.as_deref())
        })
        .await
        .map_err(|e| ExtractionError::Task {
            detail: format!("PDF extraction task panicked: {}", e),
        })??;

        Ok(join_pages(&pages))
    }

    /// Recognise the text in an image through the generative model.
    ///
    /// A failed call is [`ExtractionError::Ocr`]; a response without text
    /// yields empty output.
    pub async fn extract_image(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let max_pixels = self.max_image_pixels;
        let raw = bytes.to_vec();
        let png = tokio::task::spawn_blocking(move || encode::normalise_image(&raw, max_pixels))
            .await
            .map_err(|e| ExtractionError::Task {
                detail: format!("Image encoding task panicked: {}", e),
            })??;

        let parts = [Part::text(OCR_INSTRUCTION), Part::png(png)];
        let response = self
            .ocr
            .generate(&parts, &self.options)
            .await
            .map_err(ExtractionError::Ocr)?;

        let text = response
            .text
            .map(|t| postprocess::clean_text(&t))
            .unwrap_or_default();
        debug!("{}: recognised {} chars", self.ocr.name(), text.len());

        Ok(ExtractedText::new(text, MediaKind::Image))
    }
}

/// Concatenate per-page strings with single newlines.
///
/// Pages that yielded nothing (`None`, empty, whitespace only) are skipped
/// entirely, so they never leave a blank line behind.
pub fn join_pages(pages: &[Option<String>]) -> ExtractedText {
    let kept: Vec<&str> = pages
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect();

    debug!("{}/{} pages contributed text", kept.len(), pages.len());

    let mut extracted = ExtractedText::new(kept.join("\n"), MediaKind::Pdf);
    extracted.page_count = Some(pages.len());
    extracted.pages_with_text = Some(kept.len());
    extracted
}

fn extract_plain_text(bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::InvalidUtf8 {
        detail: e.to_string(),
    })?;
    Ok(ExtractedText::new(text.trim_start_matches('\u{FEFF}'), MediaKind::PlainText))
}
