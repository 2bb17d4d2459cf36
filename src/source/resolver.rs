//! Source resolution for uploaded documents

use crate::batch::UploadedDocument;
use crate::error::{Error, Result};
use base64::Engine;
use std::path::{Path, PathBuf};

/// Read a file into an [`UploadedDocument`] named after the file.
///
/// Files larger than `max_bytes` are not read: the document carries the real
/// size and no data, so the batch rejects it as too large.
pub fn resolve_path<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<UploadedDocument> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let size = std::fs::metadata(path)?.len();
    let data = if size > max_bytes {
        tracing::debug!(path = %path.display(), size, max_bytes, "Not reading oversized file");
        Vec::new()
    } else {
        std::fs::read(path)?
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadedDocument { name, size, data })
}

/// Decode inline base64 content under the given file name
pub fn resolve_base64(name: &str, base64_data: &str) -> Result<UploadedDocument> {
    if name.trim().is_empty() {
        return Err(Error::SourceResolution {
            reason: "base64 source requires a file name".to_string(),
        });
    }

    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;

    Ok(UploadedDocument::new(name, data))
}

/// Paths of every `.pdf` file under `dir`, sorted.
///
/// `pattern` is a glob matched against the file name only.
pub fn collect_pdf_paths(
    dir: &Path,
    recursive: bool,
    pattern: Option<&glob::Pattern>,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::SourceResolution {
            reason: format!("{} is not a directory", dir.display()),
        });
    }

    let mut paths = Vec::new();
    walk(dir, recursive, pattern, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn walk(
    dir: &Path,
    recursive: bool,
    pattern: Option<&glob::Pattern>,
    paths: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(e) => e.path(),
            Err(_) => continue,
        };

        if path.is_dir() {
            if recursive {
                // Unreadable subdirectories are skipped, not fatal
                let _ = walk(&path, recursive, pattern, paths);
            }
            continue;
        }

        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !path.is_file() || !is_pdf {
            continue;
        }

        if let Some(pat) = pattern {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !pat.matches(&name) {
                continue;
            }
        }

        paths.push(path);
    }

    Ok(())
}
