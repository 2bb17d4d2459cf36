//! PDF Pattern Extractor - Entry point
//!
//! MCP server that extracts regex matches from PDFs over stdio.

use pdf_pattern_extractor::{run_server_with_config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Colon-separated list of directories that sources must stay within
const RESOURCE_DIRS_VAR: &str = "PDF_PATTERN_RESOURCE_DIRS";
/// Per-document size ceiling in MB
const MAX_FILE_MB_VAR: &str = "PDF_PATTERN_MAX_FILE_MB";

fn config_from_env() -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::default();

    if let Ok(dirs) = std::env::var(RESOURCE_DIRS_VAR) {
        config.resource_dirs = dirs
            .split(':')
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();
    }

    if let Ok(mb) = std::env::var(MAX_FILE_MB_VAR) {
        let mb: u64 = mb
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a whole number of MB: {}", MAX_FILE_MB_VAR, e))?;
        config.max_file_bytes = mb.saturating_mul(1024 * 1024);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_pattern_extractor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config_from_env()?;

    tracing::info!(
        resource_dirs = ?config.resource_dirs,
        max_file_bytes = config.max_file_bytes,
        "Starting PDF pattern extractor"
    );

    run_server_with_config(config).await
}
