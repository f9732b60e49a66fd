//! Uploaded file bytes. Metadata (evidence rows, audit) lives in the database.

pub mod validate;

pub use validate::{is_safe_relative_path, sanitize_file_name, validate_upload, UploadRejection};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub path: String,
    pub size: usize,
    pub content_type: String,
    pub sha256: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<StoredFile, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Files on the local filesystem under a root directory.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_relative_path(path) {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<StoredFile, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!("Stored {} ({} bytes)", path, bytes.len());

        Ok(StoredFile {
            path: path.to_string(),
            size: bytes.len(),
            content_type: content_type.to_string(),
            sha256: sha256_hex(bytes),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
