//! Annotation Engine Export
//!
//! Flattens an annotation store onto its source document: page probing,
//! font resolution with built-in fallback, handwriting jitter, content
//! stamping, bulk text composition, and optional password protection.

pub mod compose;
pub mod encrypt;
pub mod error;
pub mod exporter;
pub mod fonts;
pub mod jitter;
pub mod source;
pub mod stamp;

#[cfg(test)]
pub(crate) mod testutil;

pub use compose::{compose, wrap_lines, Block, ComposeOptions};
pub use error::ExportError;
pub use exporter::{DocumentExporter, ExportOptions};
pub use fonts::{DirectoryFontSource, FontCatalog, FontSource, NoEmbeddedFonts};
pub use jitter::{JitterConfig, JitterSample};
pub use source::SourceDocument;
