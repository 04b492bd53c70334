//! Product image file storage.
//!
//! Uploaded bytes are written under a generated file name; the database
//! keeps only that name.

use async_trait::async_trait;
use rand::RngCore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Destination for uploaded product images.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write `bytes` under `file_name`, replacing any file of that name
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<()>;

    /// Delete a stored file; a file that is already gone is not an error
    async fn remove(&self, file_name: &str) -> AppResult<()>;
}

/// Images kept as plain files in one directory.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored name inside the root; path components are dropped
    fn path_for(&self, file_name: &str) -> Option<PathBuf> {
        Path::new(file_name)
            .file_name()
            .map(|name| self.root.join(name))
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<()> {
        let path = self
            .path_for(file_name)
            .ok_or_else(|| AppError::validation("Invalid image file name"))?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::internal(format!("Image directory unavailable: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::internal(format!("Image write failed: {}", e)))?;

        tracing::debug!(path = %path.display(), "Image stored");
        Ok(())
    }

    async fn remove(&self, file_name: &str) -> AppResult<()> {
        let Some(path) = self.path_for(file_name) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(format!("Image delete failed: {}", e))),
        }
    }
}

/// Storage name for an upload: the sanitized base name, four random hex
/// characters and the lower-cased extension, e.g. `desk-lamp3fa9.jpg`.
pub fn image_file_name(original_name: &str) -> String {
    let path = Path::new(original_name);

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();

    let base: String = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_lowercase();
    let base = if base.is_empty() { "image".to_string() } else { base };

    let mut suffix = [0u8; 2];
    rand::rng().fill_bytes(&mut suffix);

    format!("{}{}{}", base, hex::encode(suffix), extension)
}
