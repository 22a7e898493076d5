//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for file I/O and key-value persistence.
//! The offline cache writes page images through [`FileSystemAccess`] and keeps
//! its manifest document in a [`SettingsStore`].

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app document directories
///
/// Single calls are assumed atomic; the cache layer never relies on
/// multi-call transactions.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn store_page(fs: &dyn FileSystemAccess, data: Bytes) -> Result<()> {
///     let dir = fs.get_data_directory().await?.join("offline_content");
///     fs.create_dir_all(&dir).await?;
///     fs.write_file(&dir.join("t1-c1-p0.jpg"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's persistent data directory
    ///
    /// Downloaded content lives here rather than in the cache directory so the
    /// OS never purges it behind the manifest's back.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or overwriting it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    ///
    /// Returns an error satisfying [`BridgeError::is_not_found`](crate::BridgeError::is_not_found)
    /// when the file does not exist.
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Copy a file, overwriting the destination
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let data = self.read_file(from).await?;
        self.write_file(to, data).await
    }

    /// Delete a file, treating a missing file as success
    ///
    /// Returns `true` if a file was removed.
    async fn delete_file_if_exists(&self, path: &Path) -> Result<bool> {
        match self.delete_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite-backed store
///
/// Values are opaque strings; callers serialize structured data themselves
/// (the offline manifest is stored as one JSON document under a fixed key).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save(store: &dyn SettingsStore, json: &str) -> Result<()> {
///     store.set_string("offline_manifest", json).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any previous value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;

    mock! {
        pub Fs {}

        #[async_trait]
        impl FileSystemAccess for Fs {
            async fn get_data_directory(&self) -> Result<PathBuf>;
            async fn exists(&self, path: &Path) -> Result<bool>;
            async fn metadata(&self, path: &Path) -> Result<FileMetadata>;
            async fn create_dir_all(&self, path: &Path) -> Result<()>;
            async fn read_file(&self, path: &Path) -> Result<Bytes>;
            async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;
            async fn delete_file(&self, path: &Path) -> Result<()>;
            async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
            async fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;
            async fn delete_file_if_exists(&self, path: &Path) -> Result<bool>;
        }
    }

    struct MissingFileFs;

    #[async_trait]
    impl FileSystemAccess for MissingFileFs {
        async fn get_data_directory(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/data"))
        }
        async fn exists(&self, _path: &Path) -> Result<bool> {
            Ok(false)
        }
        async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
            Err(BridgeError::NotFound(path.display().to_string()))
        }
        async fn create_dir_all(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn read_file(&self, path: &Path) -> Result<Bytes> {
            Err(BridgeError::NotFound(path.display().to_string()))
        }
        async fn write_file(&self, _path: &Path, _data: Bytes) -> Result<()> {
            Ok(())
        }
        async fn delete_file(&self, path: &Path) -> Result<()> {
            Err(BridgeError::NotFound(path.display().to_string()))
        }
        async fn list_directory(&self, _path: &Path) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_file_metadata() {
        let metadata = FileMetadata {
            size: 1024,
            modified_at: Some(1234567900),
            is_directory: false,
        };

        assert_eq!(metadata.size, 1024);
        assert!(!metadata.is_directory);
    }

    #[tokio::test]
    async fn test_delete_if_exists_tolerates_missing_file() {
        let fs = MissingFileFs;
        let removed = fs
            .delete_file_if_exists(Path::new("/data/t1-cover.jpg"))
            .await
            .unwrap();
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_copy_propagates_missing_source() {
        let fs = MissingFileFs;
        let err = fs
            .copy_file(Path::new("/bundle/a.png"), Path::new("/data/a.png"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mocked_write_failure_surfaces() {
        let mut fs = MockFs::new();
        fs.expect_write_file()
            .returning(|_, _| Err(BridgeError::OperationFailed("disk full".to_string())));

        let err = fs
            .write_file(Path::new("/data/x.jpg"), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
