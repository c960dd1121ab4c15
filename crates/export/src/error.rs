//! Export error taxonomy
//!
//! Corrupt input and serialization problems abort the whole export; font
//! and encryption problems degrade (fallback font, unencrypted output)
//! unless the caller asked for strict encryption.

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The source bytes could not be parsed as a document
    #[error("cannot open document")]
    CannotOpen(#[source] lopdf::Error),

    /// The document parsed but has no usable pages
    #[error("document has no pages")]
    NoPages,

    /// Rewriting document structure failed; nothing partial is returned
    #[error("failed to serialize document")]
    Serialize(#[source] lopdf::Error),

    /// Writing the finished bytes failed; nothing partial is returned
    #[error("failed to write document")]
    Write(#[source] std::io::Error),

    #[error("failed to decode illustration: {0}")]
    Image(#[from] image::ImageError),

    /// Encryption failed and the caller required it strictly
    #[error("failed to encrypt document: {0}")]
    Encryption(String),
}
