//! ZIP packaging of highlighted documents

use crate::error::Result;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A highlighted copy of one source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedDocument {
    /// `{document}_highlighted.pdf`
    pub file_name: String,
    pub data: Vec<u8>,
}

impl HighlightedDocument {
    pub fn file_name_for(document: &str) -> String {
        format!("{}_highlighted.pdf", document)
    }
}

/// Highlighted documents keyed by file name, in insertion order
#[derive(Debug, Clone, Default)]
pub struct HighlightSet {
    documents: Vec<HighlightedDocument>,
}

impl HighlightSet {
    /// Add a document. An existing entry with the same file name keeps its
    /// position and takes the new bytes.
    pub fn insert(&mut self, document: HighlightedDocument) {
        match self
            .documents
            .iter_mut()
            .find(|existing| existing.file_name == document.file_name)
        {
            Some(existing) => existing.data = document.data,
            None => self.documents.push(document),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.file_name.clone()).collect()
    }

    /// Pack into a deflate-compressed ZIP, or `None` when there is nothing to pack
    pub fn into_archive(self) -> Result<Option<Vec<u8>>> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            for document in &self.documents {
                zip.start_file(document.file_name.as_str(), options)?;
                zip.write_all(&document.data)?;
            }

            zip.finish()?;
        }

        Ok(Some(buffer))
    }
}
