//! PDF Pattern Extractor Library
//!
//! Applies a regular expression to the text of a batch of PDFs and produces:
//! - a tab-separated table of matches (`Index`, `Document`, `Page`, `Match`)
//! - optionally, a ZIP of highlighted copies of every matching document
//!
//! The pipeline lives in [`batch`]; [`server`] exposes it as the
//! `extract_patterns` MCP tool.

pub mod batch;
pub mod error;
pub mod matcher;
pub mod pdf;
pub mod server;
pub mod source;

pub use batch::{
    process, process_with_source_pattern, BatchOptions, BatchOutcome, Diagnostic,
    DiagnosticLevel, ProgressObserver, UploadedDocument,
};
pub use error::{Error, Result};
pub use matcher::Pattern;
pub use server::{
    run_server, run_server_with_config, DocumentSource, ExtractPatternsParams,
    ExtractPatternsResult, PdfPatternServer, ServerConfig,
};
