//! Batch pipeline: validate, extract, match, highlight, package

mod archive;
mod table;

pub use archive::{HighlightSet, HighlightedDocument};
pub use table::{MatchRecord, ResultTable, TSV_HEADER};

use crate::matcher::Pattern;
use crate::pdf::PdfEngine;
use schemars::JsonSchema;
use serde::Serialize;

/// Default per-document size ceiling (200 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 200 * 1024 * 1024;

/// One input document
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// File name as supplied, extension included
    pub name: String,
    /// Reported size in bytes
    pub size: u64,
    pub data: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            data,
        }
    }

    /// Whether the name ends in `.pdf`, ignoring ASCII case
    pub fn has_pdf_extension(&self) -> bool {
        let name = self.name.as_bytes();
        name.len() >= 4 && name[name.len() - 4..].eq_ignore_ascii_case(b".pdf")
    }

    /// Name with its last extension removed
    pub fn document_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(dot) if dot > 0 => &self.name[..dot],
            _ => &self.name,
        }
    }
}

/// Per-batch options
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Produce highlighted copies of matching documents
    pub highlight: bool,
    /// Documents larger than this are skipped
    pub max_file_bytes: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            highlight: false,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// Advisory report about a skipped or partially failed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(document: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            document: document.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn error(document: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            document: document.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Receives one notification per document and one when the batch ends
pub trait ProgressObserver {
    /// `position` is 1-based
    fn on_document(&mut self, position: usize, total: usize, name: &str);

    fn on_finish(&mut self) {}
}

/// Observer that ignores every notification
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_document(&mut self, _position: usize, _total: usize, _name: &str) {}
}

impl<F> ProgressObserver for F
where
    F: FnMut(usize, usize, &str),
{
    fn on_document(&mut self, position: usize, total: usize, name: &str) {
        self(position, total, name)
    }
}

/// Everything a batch produces
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub table: ResultTable,
    /// Deflate ZIP of highlighted copies, absent when none were produced
    pub archive: Option<Vec<u8>>,
    /// File names inside `archive`
    pub highlighted_files: Vec<String>,
    /// Documents that made it past validation and extraction
    pub documents_processed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchOutcome {
    /// The result table as TSV; empty when nothing matched
    pub fn tsv(&self) -> String {
        self.table.to_tsv()
    }

    /// Number of match rows, header excluded
    pub fn total_matches(&self) -> usize {
        self.table.len()
    }
}

/// Compile `pattern` and run the batch.
///
/// An invalid pattern ends the batch before any document is touched, with a
/// single error diagnostic and an empty outcome.
pub fn process_with_source_pattern<E: PdfEngine>(
    engine: &E,
    documents: &[UploadedDocument],
    pattern: &str,
    options: &BatchOptions,
    progress: &mut dyn ProgressObserver,
) -> BatchOutcome {
    match Pattern::new(pattern) {
        Ok(pattern) => process(engine, documents, &pattern, options, progress),
        Err(e) => {
            tracing::error!(error = %e, "Rejected pattern");
            progress.on_finish();
            BatchOutcome {
                diagnostics: vec![Diagnostic::error(None, e.client_message())],
                ..BatchOutcome::default()
            }
        }
    }
}

/// Run the batch over `documents` in order.
///
/// Per-document failures become diagnostics and never abort the batch.
pub fn process<E: PdfEngine>(
    engine: &E,
    documents: &[UploadedDocument],
    pattern: &Pattern,
    options: &BatchOptions,
    progress: &mut dyn ProgressObserver,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut highlights = HighlightSet::default();
    let total = documents.len();

    tracing::info!(
        documents = total,
        pattern = pattern.as_str(),
        highlight = options.highlight,
        "Starting batch"
    );

    for (i, upload) in documents.iter().enumerate() {
        progress.on_document(i + 1, total, &upload.name);

        if let Some(highlighted) = process_document(engine, upload, pattern, options, &mut outcome)
        {
            highlights.insert(highlighted);
        }
    }

    outcome.highlighted_files = highlights.file_names();
    outcome.archive = match highlights.into_archive() {
        Ok(archive) => archive,
        Err(e) => {
            tracing::error!(error = %e, "Failed to package highlighted PDFs");
            outcome
                .diagnostics
                .push(Diagnostic::error(None, e.client_message()));
            outcome.highlighted_files.clear();
            None
        }
    };

    progress.on_finish();

    tracing::info!(
        matches = outcome.total_matches(),
        documents_processed = outcome.documents_processed,
        highlighted = outcome.highlighted_files.len(),
        "Batch finished"
    );

    outcome
}

/// Validate, extract and match one document, appending to `outcome`.
/// Returns the highlighted copy when one was requested and earned.
fn process_document<E: PdfEngine>(
    engine: &E,
    upload: &UploadedDocument,
    pattern: &Pattern,
    options: &BatchOptions,
    outcome: &mut BatchOutcome,
) -> Option<HighlightedDocument> {
    let name = upload.name.as_str();

    if !upload.has_pdf_extension() {
        tracing::warn!(document = name, "Skipping: not a PDF file");
        outcome
            .diagnostics
            .push(Diagnostic::warning(Some(name), "Skipped: not a PDF file"));
        return None;
    }

    if upload.size > options.max_file_bytes {
        tracing::warn!(
            document = name,
            size = upload.size,
            max_size = options.max_file_bytes,
            "Skipping: file too large"
        );
        outcome.diagnostics.push(Diagnostic::warning(
            Some(name),
            format!(
                "Skipped: file too large (>{} MB)",
                options.max_file_bytes / (1024 * 1024)
            ),
        ));
        return None;
    }

    let page_texts = match engine.page_texts(&upload.data) {
        Ok(texts) => texts,
        Err(e) => {
            tracing::warn!(document = name, error = %e, "Skipping: text extraction failed");
            outcome.diagnostics.push(Diagnostic::warning(
                Some(name),
                format!("Skipped: {}", e.client_message()),
            ));
            return None;
        }
    };

    if page_texts.is_empty() {
        tracing::warn!(document = name, "Skipping: no text content");
        outcome
            .diagnostics
            .push(Diagnostic::warning(Some(name), "Skipped: no text content found"));
        return None;
    }

    outcome.documents_processed += 1;

    let document = upload.document_name();
    let mut index: u32 = 1;

    for (&page, text) in &page_texts {
        let matches = pattern.find_matches(text);
        tracing::debug!(document, page, matches = matches.len(), "Matched page");

        for matched in matches {
            outcome.table.push(MatchRecord {
                index,
                document: document.to_string(),
                page,
                text: matched,
            });
            index += 1;
        }
    }

    let has_matches = index > 1;
    if !(options.highlight && has_matches) {
        return None;
    }

    let data = match engine.highlight(&upload.data, pattern, name) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(document = name, error = %e, "Highlighting failed, keeping original");
            outcome.diagnostics.push(Diagnostic::error(
                Some(name),
                format!("{}; original PDF included instead", e.client_message()),
            ));
            upload.data.clone()
        }
    };

    Some(HighlightedDocument {
        file_name: HighlightedDocument::file_name_for(document),
        data,
    })
}
