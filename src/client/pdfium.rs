//! PDF text layer extraction via pdfium.
//!
//! ## Why no rasterisation?
//!
//! Legal documents are overwhelmingly born-digital. Reading the embedded
//! text layer is exact and costs no model call; scanned PDFs simply yield
//! pages without text and are skipped by the extractor.
//!
//! The pdfium shared library is located (and on first use downloaded) by
//! `pdfium-auto`. Callers that want download progress should run
//! `pdfium_auto::ensure_pdfium_library` before the first extraction, the
//! way the CLI does.

use super::PdfTextSource;
use crate::error::ExtractionError;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// [`PdfTextSource`] backed by the pdfium C++ library.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextSource;

impl PdfiumTextSource {
    pub fn new() -> Self {
        Self
    }
}

impl PdfTextSource for PdfiumTextSource {
    fn page_texts(
        &self,
        pdf: &[u8],
        password: Option<&str>,
    ) -> Result<Vec<Option<String>>, ExtractionError> {
        let pdfium = pdfium_auto::bind_pdfium_silent().map_err(|e| {
            ExtractionError::PdfEngineUnavailable {
                detail: e.to_string(),
            }
        })?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| classify_load_error(format!("{:?}", e), password.is_some()))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            match page.text() {
                Ok(text) => {
                    let all = text.all();
                    debug!("Page {}: {} chars of text", idx + 1, all.len());
                    texts.push(Some(all));
                }
                Err(e) => {
                    warn!("Page {}: no text layer ({:?})", idx + 1, e);
                    texts.push(None);
                }
            }
        }

        Ok(texts)
    }
}

/// Map a pdfium load failure onto the extraction taxonomy.
///
/// pdfium reports encryption problems as a `PasswordError`; anything else
/// means the file itself could not be parsed.
fn classify_load_error(detail: String, had_password: bool) -> ExtractionError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ExtractionError::WrongPassword
        } else {
            ExtractionError::PasswordRequired
        }
    } else {
        ExtractionError::CorruptPdf { detail }
    }
}
