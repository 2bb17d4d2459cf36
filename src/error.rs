//! Error types for the PDF pattern extractor

use thiserror::Error;

/// Result type alias for the PDF pattern extractor
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF pattern extractor
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Bytes are not a loadable PDF document
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Regex pattern failed to compile
    #[error("Invalid regex pattern: {reason}")]
    InvalidPattern { reason: String },

    /// Annotating or serializing a highlighted copy failed
    #[error("Failed to highlight {document}: {reason}")]
    Highlight { document: String, reason: String },

    /// ZIP packaging error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            // The pattern is the caller's own input, so the compiler message is safe to echo
            Error::InvalidPattern { reason } => format!("Invalid regex pattern: {}", reason),
            Error::Highlight { .. } => "Failed to highlight matches".to_string(),
            Error::Archive(_) => "Failed to build archive".to_string(),
            Error::SourceResolution { .. } => "Failed to resolve PDF source".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
        }
    }
}
