#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Blob store abstraction for uploads, progress documents and results.
//!
//! The pipeline and the server only ever talk to [`BlobStore`]; the concrete
//! backend is a flat directory tree ([`FsBlobStore`]) with one subdirectory
//! per container. Reads of absent blobs are `Ok(None)`, deletes of absent
//! blobs succeed, puts always overwrite.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

mod keys;

pub use keys::{file_stem, progress_key, result_key};

/// Container for raw uploaded datasets.
pub const UPLOADS: &str = "uploads";
/// Container for per-run progress documents.
pub const PROGRESS: &str = "progress";
/// Container for annotated result datasets.
pub const RESULTS: &str = "results";

/// Errors from blob store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A container or key contained path separators or traversal segments.
    #[error("invalid blob key: {key}")]
    InvalidKey {
        /// The offending container or key.
        key: String,
    },
}

/// Key/value blob storage over named containers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `container`/`key`, overwriting any existing blob.
    ///
    /// # Errors
    ///
    /// * If the key is invalid or the write fails.
    async fn put(&self, container: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Fetches the blob at `container`/`key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// * If the key is invalid or the read fails for a reason other than
    ///   absence.
    async fn get(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Whether a blob exists at `container`/`key`.
    ///
    /// # Errors
    ///
    /// * If the key is invalid or the check fails.
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError>;

    /// Removes the blob at `container`/`key`. Deleting an absent blob is not
    /// an error.
    ///
    /// # Errors
    ///
    /// * If the key is invalid or the removal fails for a reason other than
    ///   absence.
    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed [`BlobStore`]: one subdirectory per container, one file
/// per key, rooted at a configurable directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory tree is created
    /// lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, container: &str, key: &str) -> Result<PathBuf, StorageError> {
        for segment in [container, key] {
            if segment.is_empty()
                || segment.contains('/')
                || segment.contains('\\')
                || segment == "."
                || segment == ".."
            {
                return Err(StorageError::InvalidKey {
                    key: segment.to_string(),
                });
            }
        }
        Ok(self.root.join(container).join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, container: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.blob_path(container, key)?;
        tokio::fs::create_dir_all(self.root.join(container)).await?;
        tokio::fs::write(&path, bytes).await?;
        log::info!("stored {container}/{key} ({} bytes)", bytes.len());
        Ok(())
    }

    async fn get(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.blob_path(container, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                log::debug!("read {container}/{key} ({} bytes)", bytes.len());
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError> {
        let path = self.blob_path(container, key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        let path = self.blob_path(container, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("deleted {container}/{key}");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
