//! MCP Server implementation using rmcp

use crate::batch::{
    self, BatchOptions, BatchOutcome, Diagnostic, ProgressObserver, UploadedDocument,
    DEFAULT_MAX_FILE_BYTES,
};
use crate::matcher::Pattern;
use crate::pdf::PdfiumEngine;
use crate::source::{collect_pdf_paths, resolve_base64, resolve_path};
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a document comes from
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum DocumentSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Inline base64 content
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
        /// File name, used for the extension check and the Document column
        name: String,
    },
    /// Every PDF in a directory
    Directory {
        /// Directory to scan
        directory: String,
        /// Glob on the file name (e.g. "invoice-*.pdf")
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        /// Descend into subdirectories
        #[serde(default)]
        recursive: bool,
    },
}

const SOURCE_FORMAT_HINT: &str = "expected an object with \"path\", \"base64\" + \"name\", or \"directory\"";

impl<'de> serde::Deserialize<'de> for DocumentSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| {
            D::Error::custom(format!("Invalid source: {}, but got {}", SOURCE_FORMAT_HINT, value))
        })?;

        let string_field = |key: &str| -> std::result::Result<Option<String>, D::Error> {
            match obj.get(key) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(D::Error::custom(format!("\"{}\" must be a string", key))),
            }
        };

        if let Some(path) = string_field("path")? {
            return Ok(DocumentSource::Path { path });
        }

        if let Some(base64) = string_field("base64")? {
            let name = string_field("name")?
                .ok_or_else(|| D::Error::custom("\"base64\" sources need a \"name\""))?;
            return Ok(DocumentSource::Base64 { base64, name });
        }

        if let Some(directory) = string_field("directory")? {
            let recursive = match obj.get("recursive") {
                None | Some(serde_json::Value::Null) => false,
                Some(serde_json::Value::Bool(b)) => *b,
                Some(_) => return Err(D::Error::custom("\"recursive\" must be a boolean")),
            };
            return Ok(DocumentSource::Directory {
                directory,
                pattern: string_field("pattern")?,
                recursive,
            });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(D::Error::custom(format!(
            "Invalid source: {}, but got keys: {:?}",
            SOURCE_FORMAT_HINT, keys
        )))
    }
}

/// Security and resource configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories that path, directory and archive_path arguments must stay within.
    /// Empty means unrestricted.
    pub resource_dirs: Vec<String>,
    /// Per-document size ceiling in bytes (default: 200MB)
    pub max_file_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// PDF pattern extraction MCP server
#[derive(Clone)]
pub struct PdfPatternServer {
    tool_router: ToolRouter<Self>,
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for extract_patterns
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractPatternsParams {
    /// PDF sources to process, in order
    pub sources: Vec<DocumentSource>,
    /// Regular expression, matched case-insensitively in multiline mode
    pub pattern: String,
    /// Produce a ZIP of highlighted copies of every matching PDF
    #[serde(default)]
    pub create_highlighted_pdfs: bool,
    /// Skip PDFs larger than this many MB (default: server setting, 200MB)
    #[serde(default)]
    pub max_file_size_mb: Option<u64>,
    /// Write the highlight ZIP to this path instead of returning it inline
    #[serde(default)]
    pub archive_path: Option<String>,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct ExtractPatternsResult {
    /// Tab-separated Index/Document/Page/Match rows with header; empty when nothing matched
    pub table: String,
    /// Number of match rows, header excluded
    pub total_matches: usize,
    /// Documents that passed validation and had extractable text
    pub documents_processed: usize,
    /// Entries of the highlight ZIP
    pub highlighted_files: Vec<String>,
    /// Base64 encoded highlight ZIP (when no archive_path was given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_base64: Option<String>,
    /// Where the highlight ZIP was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<String>,
    /// Per-document warnings and errors
    pub diagnostics: Vec<Diagnostic>,
}

/// Logs batch progress
struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_document(&mut self, position: usize, total: usize, name: &str) {
        tracing::info!(position, total, document = name, "Processing document");
    }

    fn on_finish(&mut self) {
        tracing::debug!("Batch progress complete");
    }
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl PdfPatternServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new server with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Extract regex matches from PDFs into a TSV table
    #[tool(
        description = "Extract text from PDF files, apply a regular expression to every page (case-insensitive, multiline) and return the matches as tab-separated rows: Index, Document, Page, Match. Capture groups are joined with a space. Optionally returns a ZIP of highlighted copies of every matching PDF.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"}, {\"base64\": \"...\", \"name\": \"file.pdf\"}, or {\"directory\": \"/dir\", \"pattern\": \"*.pdf\", \"recursive\": false}"
    )]
    async fn extract_patterns(
        &self,
        Parameters(params): Parameters<ExtractPatternsParams>,
    ) -> String {
        let result = self.process_extract_patterns(&params).await;
        serde_json::to_string_pretty(&result).unwrap_or_default()
    }
}

impl PdfPatternServer {
    fn source_name(source: &DocumentSource) -> String {
        match source {
            DocumentSource::Path { path } => path.clone(),
            DocumentSource::Base64 { name, .. } => format!("<base64:{}>", name),
            DocumentSource::Directory { directory, .. } => directory.clone(),
        }
    }

    /// Run the whole request. Failures past pattern validation never discard
    /// the table; they are reported as diagnostics instead.
    pub async fn process_extract_patterns(
        &self,
        params: &ExtractPatternsParams,
    ) -> ExtractPatternsResult {
        let pattern = match Pattern::new(&params.pattern) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected pattern");
                return ExtractPatternsResult {
                    diagnostics: vec![Diagnostic::error(None, e.client_message())],
                    ..ExtractPatternsResult::default()
                };
            }
        };

        let options = BatchOptions {
            highlight: params.create_highlighted_pdfs,
            max_file_bytes: params
                .max_file_size_mb
                .map(|mb| mb.saturating_mul(1024 * 1024))
                .unwrap_or(self.config.max_file_bytes),
        };

        let (documents, mut diagnostics) =
            self.resolve_sources(&params.sources, options.max_file_bytes);

        let outcome = if documents.is_empty() {
            BatchOutcome::default()
        } else {
            match run_batch(documents, pattern, options).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Batch could not run");
                    diagnostics.push(Diagnostic::error(None, e.client_message()));
                    BatchOutcome::default()
                }
            }
        };

        self.build_result(outcome, diagnostics, &params.archive_path)
    }

    /// Turn a batch outcome into the tool response, delivering the archive
    /// inline or to `archive_path`.
    fn build_result(
        &self,
        mut outcome: BatchOutcome,
        mut diagnostics: Vec<Diagnostic>,
        archive_path: &Option<String>,
    ) -> ExtractPatternsResult {
        diagnostics.append(&mut outcome.diagnostics);

        let (archive_base64, written_path) = match &outcome.archive {
            Some(archive) if archive_path.is_some() => {
                match self.write_output(archive_path, archive) {
                    Ok(path) => (None, path),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to write highlight archive");
                        diagnostics.push(Diagnostic::error(
                            None,
                            format!("Highlight archive not written: {}", e.client_message()),
                        ));
                        outcome.highlighted_files.clear();
                        (None, None)
                    }
                }
            }
            Some(archive) => (
                Some(base64::engine::general_purpose::STANDARD.encode(archive)),
                None,
            ),
            None => (None, None),
        };

        ExtractPatternsResult {
            table: outcome.tsv(),
            total_matches: outcome.total_matches(),
            documents_processed: outcome.documents_processed,
            highlighted_files: outcome.highlighted_files,
            archive_base64,
            archive_path: written_path,
            diagnostics,
        }
    }

    /// Load every source in order. Failures become warnings and only the
    /// failing item is dropped.
    fn resolve_sources(
        &self,
        sources: &[DocumentSource],
        max_file_bytes: u64,
    ) -> (Vec<UploadedDocument>, Vec<Diagnostic>) {
        let mut documents = Vec::new();
        let mut diagnostics = Vec::new();

        for source in sources {
            match source {
                DocumentSource::Path { path } => match self
                    .validate_path_access(path)
                    .and_then(|_| resolve_path(path, max_file_bytes))
                {
                    Ok(doc) => documents.push(doc),
                    Err(e) => diagnostics.push(skipped(path, &e)),
                },
                DocumentSource::Base64 { base64, name } => match resolve_base64(name, base64) {
                    Ok(doc) => documents.push(doc),
                    Err(e) => diagnostics.push(skipped(&Self::source_name(source), &e)),
                },
                DocumentSource::Directory {
                    directory,
                    pattern,
                    recursive,
                } => match self.directory_paths(directory, pattern.as_deref(), *recursive) {
                    Ok(paths) => {
                        for path in paths {
                            match resolve_path(&path, max_file_bytes) {
                                Ok(doc) => documents.push(doc),
                                Err(e) => {
                                    diagnostics.push(skipped(&path.display().to_string(), &e))
                                }
                            }
                        }
                    }
                    Err(e) => diagnostics.push(skipped(directory, &e)),
                },
            }
        }

        (documents, diagnostics)
    }

    fn directory_paths(
        &self,
        directory: &str,
        pattern: Option<&str>,
        recursive: bool,
    ) -> crate::error::Result<Vec<PathBuf>> {
        let dir = self.validate_path_access(directory)?;

        let pattern = pattern
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| crate::error::Error::SourceResolution {
                reason: format!("Invalid file pattern: {}", e),
            })?;

        collect_pdf_paths(&dir, recursive, pattern.as_ref())
    }

    fn is_within_resource_dirs(&self, canonical: &Path) -> bool {
        self.config.resource_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|cd| canonical.starts_with(&cd))
                .unwrap_or(false)
        })
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let denied = || crate::error::Error::PathAccessDenied {
            path: path.to_string(),
        };

        let canonical = std::fs::canonicalize(path).map_err(|_| denied())?;
        if self.is_within_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(denied())
        }
    }

    /// Validate an output path. The file may not exist yet, so its parent is canonicalized.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let denied = || crate::error::Error::PathAccessDenied {
            path: path.to_string(),
        };

        let path_obj = Path::new(path);
        let parent = match path_obj.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = path_obj.file_name().ok_or_else(denied)?;

        let canonical_parent = std::fs::canonicalize(parent).map_err(|_| denied())?;
        let canonical_target = canonical_parent.join(file_name);

        if self.is_within_resource_dirs(&canonical_target) {
            Ok(canonical_target)
        } else {
            Err(denied())
        }
    }

    /// Write output data to a file path, with sandbox validation.
    fn write_output(
        &self,
        output_path: &Option<String>,
        data: &[u8],
    ) -> crate::error::Result<Option<String>> {
        let Some(path_str) = output_path else {
            return Ok(None);
        };

        self.validate_output_path_access(path_str)?;

        let path = Path::new(path_str);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, data)?;
        Ok(Some(path_str.clone()))
    }
}

/// Bind PDFium and run the batch off the async runtime
async fn run_batch(
    documents: Vec<UploadedDocument>,
    pattern: Pattern,
    options: BatchOptions,
) -> crate::error::Result<BatchOutcome> {
    tokio::task::spawn_blocking(move || {
        let engine = PdfiumEngine::new()?;
        Ok::<_, crate::error::Error>(batch::process(
            &engine,
            &documents,
            &pattern,
            &options,
            &mut TracingProgress,
        ))
    })
    .await
    .map_err(|e| crate::error::Error::Pdfium {
        reason: format!("Task join error: {}", e),
    })?
}

fn skipped(source: &str, error: &crate::error::Error) -> Diagnostic {
    tracing::warn!(source, error = %error, "Failed to resolve source");
    Diagnostic::warning(Some(source), format!("Skipped: {}", error.client_message()))
}

impl Default for PdfPatternServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for PdfPatternServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Extracts regular expression matches from PDF text into a spreadsheet-ready \
                 TSV table and can return highlighted copies of the matching PDFs."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with default configuration
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = PdfPatternServer::with_config(config);

    tracing::info!("PDF pattern extractor ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{DiagnosticLevel, MatchRecord};

    fn params(sources: Vec<DocumentSource>, pattern: &str) -> ExtractPatternsParams {
        ExtractPatternsParams {
            sources,
            pattern: pattern.to_string(),
            create_highlighted_pdfs: false,
            max_file_size_mb: None,
            archive_path: None,
        }
    }

    fn sandboxed(dir: &Path) -> PdfPatternServer {
        PdfPatternServer::with_config(ServerConfig {
            resource_dirs: vec![dir.to_string_lossy().to_string()],
            ..ServerConfig::default()
        })
    }

    #[test]
    fn test_source_name() {
        assert_eq!(
            PdfPatternServer::source_name(&DocumentSource::Path {
                path: "/test.pdf".to_string()
            }),
            "/test.pdf"
        );
        assert_eq!(
            PdfPatternServer::source_name(&DocumentSource::Base64 {
                base64: "...".to_string(),
                name: "scan.pdf".to_string(),
            }),
            "<base64:scan.pdf>"
        );
        assert_eq!(
            PdfPatternServer::source_name(&DocumentSource::Directory {
                directory: "/inbox".to_string(),
                pattern: None,
                recursive: true,
            }),
            "/inbox"
        );
    }

    #[test]
    fn test_document_source_deserialization() {
        let source: DocumentSource = serde_json::from_str(r#"{"path": "/test.pdf"}"#).unwrap();
        assert!(matches!(source, DocumentSource::Path { .. }));

        let source: DocumentSource =
            serde_json::from_str(r#"{"base64": "JVBERi0xLjQ=", "name": "a.pdf"}"#).unwrap();
        assert!(matches!(source, DocumentSource::Base64 { ref name, .. } if name == "a.pdf"));

        let source: DocumentSource =
            serde_json::from_str(r#"{"directory": "/in", "recursive": true}"#).unwrap();
        assert!(matches!(
            source,
            DocumentSource::Directory { recursive: true, pattern: None, .. }
        ));
    }

    #[test]
    fn test_document_source_deserialization_errors() {
        let err = serde_json::from_str::<DocumentSource>(r#"{"base64": "JVBERi0xLjQ="}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("\"name\""));

        let err = serde_json::from_str::<DocumentSource>(r#"{"url": "https://x"}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("url"));

        assert!(serde_json::from_str::<DocumentSource>(r#"{"path": 5}"#).is_err());
        assert!(serde_json::from_str::<DocumentSource>(r#""/test.pdf""#).is_err());
    }

    #[test]
    fn test_params_deserialization() {
        let json = r#"{
            "sources": [{"path": "/test.pdf"}],
            "pattern": "\\d+"
        }"#;
        let params: ExtractPatternsParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.pattern, r"\d+");
        assert!(!params.create_highlighted_pdfs);
        assert!(params.max_file_size_mb.is_none());
        assert!(params.archive_path.is_none());
    }

    #[tokio::test]
    async fn test_invalid_pattern_reports_once() {
        let server = PdfPatternServer::new();
        let params = params(
            vec![DocumentSource::Path {
                path: "/nonexistent/a.pdf".to_string(),
            }],
            "(unclosed",
        );

        let result = server.process_extract_patterns(&params).await;
        assert_eq!(result.table, "");
        assert_eq!(result.total_matches, 0);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].level, DiagnosticLevel::Error);
        assert!(result.archive_base64.is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_sources_become_warnings() {
        let server = PdfPatternServer::new();
        let params = params(
            vec![
                DocumentSource::Path {
                    path: "/nonexistent/a.pdf".to_string(),
                },
                DocumentSource::Base64 {
                    base64: "!!!".to_string(),
                    name: "b.pdf".to_string(),
                },
            ],
            r"\d+",
        );

        let result = server.process_extract_patterns(&params).await;
        assert_eq!(result.table, "");
        assert_eq!(result.documents_processed, 0);
        let messages: Vec<_> = result
            .diagnostics
            .iter()
            .map(|d| (d.level, d.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            vec![
                (DiagnosticLevel::Warning, "Skipped: PDF not found"),
                (DiagnosticLevel::Warning, "Skipped: Invalid base64 data"),
            ]
        );
    }

    #[test]
    fn test_validate_path_no_resource_dirs_allows_all() {
        let server = PdfPatternServer::new();
        assert!(server.validate_path_access("/anywhere/file.pdf").is_ok());
    }

    #[test]
    fn test_validate_path_within_and_outside_resource_dir() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let inside = allowed.path().join("in.pdf");
        let outside = other.path().join("out.pdf");
        std::fs::write(&inside, b"%PDF").unwrap();
        std::fs::write(&outside, b"%PDF").unwrap();

        let server = sandboxed(allowed.path());
        assert!(server
            .validate_path_access(&inside.to_string_lossy())
            .is_ok());
        assert!(matches!(
            server.validate_path_access(&outside.to_string_lossy()),
            Err(crate::error::Error::PathAccessDenied { .. })
        ));

        let traversal = format!(
            "{}/../{}/out.pdf",
            allowed.path().to_string_lossy(),
            other.path().file_name().unwrap().to_string_lossy()
        );
        assert!(matches!(
            server.validate_path_access(&traversal),
            Err(crate::error::Error::PathAccessDenied { .. })
        ));
    }

    #[test]
    fn test_write_output_sandboxed() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let server = sandboxed(allowed.path());

        let target = allowed.path().join("highlights.zip");
        let written = server
            .write_output(&Some(target.to_string_lossy().to_string()), b"PK")
            .unwrap();
        assert!(written.is_some());
        assert_eq!(std::fs::read(&target).unwrap(), b"PK");

        let denied = other.path().join("highlights.zip");
        assert!(server
            .write_output(&Some(denied.to_string_lossy().to_string()), b"PK")
            .is_err());
        assert!(!denied.exists());

        assert_eq!(server.write_output(&None, b"PK").unwrap(), None);
    }

    #[tokio::test]
    async fn test_directory_source_outside_sandbox_denied() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let server = sandboxed(allowed.path());

        let params = params(
            vec![DocumentSource::Directory {
                directory: other.path().to_string_lossy().to_string(),
                pattern: None,
                recursive: false,
            }],
            r"\d+",
        );

        let result = server.process_extract_patterns(&params).await;
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "Skipped: Access denied");
    }

    fn outcome_with_archive() -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        outcome.table.push(MatchRecord {
            index: 1,
            document: "cards".to_string(),
            page: 1,
            text: "1234-5678-9012".to_string(),
        });
        outcome.archive = Some(b"PK\x05\x06".to_vec());
        outcome.highlighted_files = vec!["cards_highlighted.pdf".to_string()];
        outcome.documents_processed = 1;
        outcome
    }

    #[test]
    fn test_denied_archive_path_keeps_table() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let server = sandboxed(allowed.path());
        let target = other.path().join("highlights.zip");

        let resolution = vec![Diagnostic::warning(Some("notes.txt"), "Skipped: PDF not found")];
        let result = server.build_result(
            outcome_with_archive(),
            resolution,
            &Some(target.to_string_lossy().to_string()),
        );

        assert_eq!(
            result.table,
            "Index\tDocument\tPage\tMatch\n1\tcards\t1\t1234-5678-9012"
        );
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.documents_processed, 1);
        assert!(result.archive_base64.is_none());
        assert!(result.archive_path.is_none());
        assert!(result.highlighted_files.is_empty());
        assert!(!target.exists());

        let levels: Vec<_> = result.diagnostics.iter().map(|d| d.level).collect();
        assert_eq!(levels, vec![DiagnosticLevel::Warning, DiagnosticLevel::Error]);
        assert!(result.diagnostics[1].message.contains("Access denied"));
    }

    #[test]
    fn test_archive_written_inside_sandbox() {
        let allowed = tempfile::tempdir().unwrap();
        let server = sandboxed(allowed.path());
        let target = allowed.path().join("out").join("highlights.zip");
        let target_str = target.to_string_lossy().to_string();

        let result = server.build_result(outcome_with_archive(), Vec::new(), &Some(target_str.clone()));

        assert_eq!(result.archive_path, Some(target_str));
        assert!(result.archive_base64.is_none());
        assert_eq!(result.highlighted_files, vec!["cards_highlighted.pdf"]);
        assert_eq!(std::fs::read(&target).unwrap(), b"PK\x05\x06");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_archive_inline_without_path() {
        let server = PdfPatternServer::new();
        let result = server.build_result(outcome_with_archive(), Vec::new(), &None);

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(result.archive_base64.unwrap())
            .unwrap();
        assert_eq!(decoded, b"PK\x05\x06");
        assert!(result.archive_path.is_none());
    }

    #[test]
    fn test_directory_source_oversized_file_not_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("small.pdf"), b"%PDF-1.7").unwrap();
        std::fs::write(dir.path().join("large.pdf"), vec![b'x'; 64]).unwrap();

        let server = PdfPatternServer::new();
        let (documents, diagnostics) = server.resolve_sources(
            &[DocumentSource::Directory {
                directory: dir.path().to_string_lossy().to_string(),
                pattern: None,
                recursive: false,
            }],
            16,
        );

        assert!(diagnostics.is_empty());
        let loaded: Vec<_> = documents
            .iter()
            .map(|d| (d.name.as_str(), d.size, d.data.len()))
            .collect();
        assert_eq!(loaded, vec![("large.pdf", 64, 0), ("small.pdf", 8, 8)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_in_directory_skipped_alone() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();
        let locked = dir.path().join("b.pdf");
        std::fs::write(&locked, b"%PDF-b").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        if std::fs::read(&locked).is_ok() {
            // Permission bits are not enforced for this user (e.g. root)
            return;
        }

        let server = PdfPatternServer::new();
        let (documents, diagnostics) = server.resolve_sources(
            &[DocumentSource::Directory {
                directory: dir.path().to_string_lossy().to_string(),
                pattern: None,
                recursive: false,
            }],
            DEFAULT_MAX_FILE_BYTES,
        );

        let names: Vec<_> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].level, DiagnosticLevel::Warning);
        assert!(diagnostics[0].document.as_deref().unwrap().ends_with("b.pdf"));
    }

    #[test]
    fn test_pdf_pattern_server_default() {
        let server = PdfPatternServer::default();
        assert!(server.config.resource_dirs.is_empty());
        assert_eq!(server.config.max_file_bytes, 200 * 1024 * 1024);
    }
}
