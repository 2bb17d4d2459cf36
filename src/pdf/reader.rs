//! PDFium-backed engine

use super::highlight::annotate_document;
use super::{has_pdf_header, PageTexts, PdfEngine};
use crate::error::{Error, Result};
use crate::matcher::Pattern;
use pdfium_render::prelude::*;

/// Bind a PDFium library (PDFium is not thread-safe, so each engine owns its own binding)
fn create_pdfium() -> Result<Pdfium> {
    // Try the working directory, the conventional install prefix, then the system loader
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// [`PdfEngine`] over a single PDFium binding.
///
/// Create one per batch and keep it on the thread that created it.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind PDFium, failing with [`Error::Pdfium`] when no library can be found
    pub fn new() -> Result<Self> {
        Ok(Self {
            pdfium: create_pdfium()?,
        })
    }

    /// Load a document from bytes. The returned handle closes the document on drop.
    pub(crate) fn load<'a>(&'a self, data: &'a [u8]) -> Result<PdfDocument<'a>> {
        if !has_pdf_header(data) {
            return Err(Error::InvalidPdf {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        self.pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(map_pdfium_error)
    }
}

impl PdfEngine for PdfiumEngine {
    fn page_texts(&self, data: &[u8]) -> Result<PageTexts> {
        let document = self.load(data)?;
        let pages = document.pages();
        let mut texts = PageTexts::new();

        for index in 0..pages.len() {
            let page = pages.get(index).map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })?;

            let text = page_text(&page)?;
            if text.is_empty() {
                continue;
            }

            texts.insert(u32::from(index) + 1, text);
        }

        Ok(texts)
    }

    fn highlight(&self, data: &[u8], pattern: &Pattern, document: &str) -> Result<Vec<u8>> {
        let to_highlight_error = |e: Error| Error::Highlight {
            document: document.to_string(),
            reason: e.to_string(),
        };

        let pdf = self.load(data).map_err(to_highlight_error)?;
        let annotations = annotate_document(&pdf, pattern).map_err(to_highlight_error)?;

        tracing::debug!(document, annotations, "Highlight annotations added");

        pdf.save_to_bytes().map_err(|e| Error::Highlight {
            document: document.to_string(),
            reason: format!("Failed to save highlighted PDF: {}", e),
        })
    }
}

/// Plain text layer of one page
fn page_text(page: &PdfPage) -> Result<String> {
    let text = page.text().map_err(|e| Error::Pdfium {
        reason: format!("Failed to load text layer: {}", e),
    })?;

    Ok(text.all())
}

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            Error::InvalidPdf {
                reason: "PDFium could not parse the document".to_string(),
            }
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::InvalidPdf {
                reason: "PDF is password protected".to_string(),
            }
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}
