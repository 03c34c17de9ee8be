//! Filesystem media store
//!
//! Stores the original receipt files under a configurable directory.
//! Filenames are reduced to their final path component so a stored name can
//! never escape the media root.

use std::path::{Path, PathBuf};

use application::{error::ApplicationError, ports::MediaStore};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::config::MediaConfig;

/// Media store backed by the local filesystem
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    /// Create a new filesystem media store
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
        }
    }

    /// Create a store rooted at an explicit path
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, ApplicationError> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| ApplicationError::Internal(format!("invalid filename: {filename}")))?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    #[instrument(skip(self, data), fields(filename = %filename, size = data.len()))]
    async fn save(&self, filename: &str, data: &[u8]) -> Result<String, ApplicationError> {
        let path = self.resolve(filename)?;

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ApplicationError::Internal(format!("create media dir: {e}")))?;

        fs::write(&path, data)
            .await
            .map_err(|e| ApplicationError::Internal(format!("write media file: {e}")))?;

        debug!("Stored media file");

        let stored = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_string();
        Ok(stored)
    }

    #[instrument(skip(self), fields(filename = %filename))]
    async fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        let path = self.resolve(filename)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApplicationError::Internal(format!("read media file: {e}"))),
        }
    }

    #[instrument(skip(self), fields(filename = %filename))]
    async fn delete(&self, filename: &str) -> Result<bool, ApplicationError> {
        let path = self.resolve(filename)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ApplicationError::Internal(format!(
                "delete media file: {e}"
            ))),
        }
    }
}
