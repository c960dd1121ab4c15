//! Persistence gateway for finished exports
//!
//! Two targets: a local file named after the document title, and an
//! external record store holding the bytes as a base64 payload keyed by
//! id. Persistence failures are their own error type, distinct from
//! export failures, so a caller can retry just the persistence step
//! without recomputing the export.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document title is empty")]
    EmptyTitle,
    #[error("stored record {0} not found")]
    NotFound(Uuid),
    #[error("payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Save exported bytes as a local file named by the document title
///
/// Returns the path written. The title is sanitized into a file name;
/// a `.pdf` extension is appended when missing.
pub fn save_local(dir: &Path, title: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
    let name = file_name_for(title)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    write_atomically(&path, bytes)?;
    Ok(path)
}

fn file_name_for(title: &str) -> Result<String, StorageError> {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(StorageError::EmptyTitle);
    }
    if cleaned.to_ascii_lowercase().ends_with(".pdf") {
        Ok(cleaned)
    } else {
        Ok(format!("{cleaned}.pdf"))
    }
}

/// Write via a sibling temp file and rename, so a crash mid-write never
/// leaves a truncated file at the target path
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// One record in the external document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub title: String,
    pub folder: String,
    /// The exported bytes, base64-encoded
    pub payload: String,
}

impl StoredDocument {
    pub fn new(id: Uuid, title: impl Into<String>, folder: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            id,
            title: title.into(),
            folder: folder.into(),
            payload: BASE64.encode(bytes),
        }
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, StorageError> {
        Ok(BASE64.decode(&self.payload)?)
    }
}

/// Upsert-by-id record store for exported documents
///
/// With an id the existing record is overwritten; without one a new
/// record is created and its fresh id returned.
pub trait DocumentStore {
    fn upsert(
        &mut self,
        id: Option<Uuid>,
        title: &str,
        folder: &str,
        bytes: &[u8],
    ) -> Result<Uuid, StorageError>;

    fn fetch(&self, id: Uuid) -> Result<StoredDocument, StorageError>;
}

/// File-backed [`DocumentStore`], one JSON file per record
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl DocumentStore for JsonFileStore {
    fn upsert(
        &mut self,
        id: Option<Uuid>,
        title: &str,
        folder: &str,
        bytes: &[u8],
    ) -> Result<Uuid, StorageError> {
        if title.trim().is_empty() {
            return Err(StorageError::EmptyTitle);
        }
        let id = id.unwrap_or_else(Uuid::new_v4);
        let record = StoredDocument::new(id, title, folder, bytes);

        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_vec_pretty(&record)?;
        write_atomically(&self.record_path(id), &json)?;
        log::debug!("stored document {id} ({} bytes)", bytes.len());
        Ok(id)
    }

    fn fetch(&self, id: Uuid) -> Result<StoredDocument, StorageError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id));
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
