//! PDF processing layer
//!
//! Text extraction and highlight annotation are PDFium capabilities. They sit
//! behind [`PdfEngine`] so the batch pipeline does not depend on a native
//! library being present.

mod highlight;
mod reader;

use crate::error::Result;
use crate::matcher::Pattern;
use std::collections::BTreeMap;

pub use highlight::{plan_page, HIGHLIGHT_COLOR};
pub use reader::PdfiumEngine;

/// Extracted text keyed by 1-based physical page number.
/// Pages that yielded no text are absent.
pub type PageTexts = BTreeMap<u32, String>;

/// The PDF capabilities the batch pipeline needs
pub trait PdfEngine {
    /// Load `data` as a document and return the text layer of every non-empty page
    fn page_texts(&self, data: &[u8]) -> Result<PageTexts>;

    /// Load a fresh copy of `data`, highlight every on-page occurrence of
    /// `pattern`'s matches and return the serialized document.
    ///
    /// `document` is only used for error reporting.
    fn highlight(&self, data: &[u8], pattern: &Pattern, document: &str) -> Result<Vec<u8>>;
}

/// Whether `data` starts with the PDF file signature
pub(crate) fn has_pdf_header(data: &[u8]) -> bool {
    data.len() >= 4 && &data[0..4] == b"%PDF"
}
