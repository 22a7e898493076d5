//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "reader-core";

/// Tokio-based file system implementation
///
/// Downloaded chapters live under the platform data directory
/// (`~/.local/share/reader-core` on Linux, `~/Library/Application Support/reader-core`
/// on macOS), never under the cache directory the OS may purge.
pub struct TokioFileSystem {
    data_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor rooted at the platform data directory
    pub fn new() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR_NAME);

        Self { data_dir }
    }

    /// Create a new file system accessor with a custom data directory
    pub fn with_data_directory(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    fn to_unix_seconds(time: std::io::Result<std::time::SystemTime>) -> Option<i64> {
        time.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        if !fs::try_exists(&self.data_dir)
            .await
            .map_err(Self::map_io_error)?
        {
            fs::create_dir_all(&self.data_dir)
                .await
                .map_err(Self::map_io_error)?;
            debug!(path = ?self.data_dir, "Created data directory");
        }
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: Self::to_unix_seconds(metadata.modified()),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent).await?;
        }

        let size = fs::copy(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, size, "Copied file");
        Ok(())
    }
}
