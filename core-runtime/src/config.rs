//! # Core Configuration Module
//!
//! Builder-based configuration holding every bridge the reader core needs.
//! `build()` fails fast with an actionable [`Error::CapabilityMissing`] when a
//! required bridge is absent.
//!
//! ## Required Dependencies
//!
//! - `ContentCatalog` - Source of cover and page references (always host-provided)
//! - `FileSystemAccess` - Where page files are written (desktop default: tokio fs)
//! - `SettingsStore` - Holds the offline manifest (desktop default: SQLite)
//! - `HttpClient` - Fetches remote images (desktop default: reqwest)
//!
//! ## Optional Dependencies
//!
//! - `AssetLoader` - Needed only when the catalog returns bundled assets
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .catalog(Arc::new(MyCatalog::new()))
//!     .asset_loader(Arc::new(MyAssetLoader))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AssetLoader, ContentCatalog, FileSystemAccess, HttpClient, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Core configuration for the reader core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub file_system: Arc<dyn FileSystemAccess>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub http_client: Arc<dyn HttpClient>,
    pub catalog: Arc<dyn ContentCatalog>,
    pub asset_loader: Option<Arc<dyn AssetLoader>>,

    /// Absolute directory for downloaded content. When unset, the offline
    /// cache places content under the file system's data directory.
    pub content_dir: Option<PathBuf>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("catalog", &"ContentCatalog { ... }")
            .field(
                "asset_loader",
                &self.asset_loader.as_ref().map(|_| "AssetLoader { ... }"),
            )
            .field("content_dir", &self.content_dir)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if let Some(dir) = &self.content_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Content directory cannot be empty".to_string(),
                ));
            }
            if !dir.is_absolute() {
                return Err(Error::Config(format!(
                    "Content directory must be absolute: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

fn catalog_missing_error() -> Error {
    Error::capability_missing(
        "ContentCatalog",
        "A ContentCatalog is required to look up cover and page sources. \
         Inject the host's catalog client with .catalog().",
    )
}

#[cfg(not(feature = "desktop-shims"))]
fn missing_error(capability: &str, purpose: &str, desktop_default: &str) -> Error {
    Error::capability_missing(
        capability,
        format!(
            "{} implementation is required {}. \
             Desktop: enable the 'desktop-shims' feature to use the default {}. \
             Mobile: inject the platform-native adapter.",
            capability, purpose, desktop_default
        ),
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    let fs: Arc<dyn FileSystemAccess> = Arc::new(bridge_desktop::TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(missing_error(
        "FileSystemAccess",
        "to store downloaded pages",
        "TokioFileSystem",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to initialize default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(missing_error(
        "HttpClient",
        "to fetch remote page images",
        "ReqwestHttpClient",
    ))
}

/// Opens the desktop SQLite settings store.
///
/// `build()` is synchronous, so the store is created on a dedicated runtime;
/// inside an existing runtime that work moves to a helper thread.
#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(
    file_system: &Arc<dyn FileSystemAccess>,
    database_path: Option<PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let init_store = |fs: Arc<dyn FileSystemAccess>, path: Option<PathBuf>| -> Result<_> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime.block_on(async move {
            let path = match path {
                Some(path) => path,
                None => fs
                    .get_data_directory()
                    .await
                    .map_err(|e| {
                        Error::Internal(format!("Failed to resolve data directory: {}", e))
                    })?
                    .join("settings.db"),
            };

            SqliteSettingsStore::new(path).await.map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
        })
    };

    let store = match Handle::try_current() {
        Ok(_) => {
            let fs = Arc::clone(file_system);
            thread::spawn(move || init_store(fs, database_path))
                .join()
                .map_err(|_| {
                    Error::Internal(
                        "Worker thread panicked while creating default SettingsStore".to_string(),
                    )
                })??
        }
        Err(_) => init_store(Arc::clone(file_system), database_path)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(
    _file_system: &Arc<dyn FileSystemAccess>,
    _database_path: Option<PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    Err(missing_error(
        "SettingsStore",
        "to persist the offline manifest",
        "SqliteSettingsStore",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    catalog: Option<Arc<dyn ContentCatalog>>,
    asset_loader: Option<Arc<dyn AssetLoader>>,
    settings_db_path: Option<PathBuf>,
    content_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the file system access implementation.
    ///
    /// If not provided, `TokioFileSystem` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the settings store that will hold the offline manifest.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the HTTP client used to fetch remote images.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the content catalog (required).
    pub fn catalog(mut self, catalog: Arc<dyn ContentCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the platform asset loader for bundled assets.
    pub fn asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.asset_loader = Some(loader);
        self
    }

    /// Database file for the default desktop settings store.
    ///
    /// Ignored when a settings store is injected. Default:
    /// `<data dir>/settings.db`.
    pub fn settings_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_db_path = Some(path.into());
        self
    }

    /// Absolute directory for downloaded content.
    pub fn content_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.content_dir = Some(path.into());
        self
    }

    /// Event bus buffer size. Default: [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig`, injecting desktop defaults where
    /// available and failing with `CapabilityMissing` otherwise.
    pub fn build(self) -> Result<CoreConfig> {
        let catalog = self.catalog.ok_or_else(catalog_missing_error)?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&file_system, self.settings_db_path)?,
        };

        let config = CoreConfig {
            file_system,
            settings_store,
            http_client,
            catalog,
            asset_loader: self.asset_loader,
            content_dir: self.content_dir,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}
