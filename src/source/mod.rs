//! Source resolution

pub mod resolver;

pub use resolver::{collect_pdf_paths, resolve_base64, resolve_path};
