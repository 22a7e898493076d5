//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! settings, asset loader, content catalog) into the offline content cache
//! and exposes the operations reader UIs call: request downloads, delete
//! chapters, and query per-chapter and per-title status. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so missing bridges are filled with desktop adapters.

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{AssetRef, ChapterSourceSet};
pub use core_offline::{
    ChapterState, ChapterStatus, DeletionReport, DownloadReport, DownloadSummary, FailurePolicy,
    OfflineConfig, OfflineError,
};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, DownloadEvent, EventStream, ManifestEvent};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::DirectoryAssetLoader;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::ContentCatalog;
use core_offline::{
    BridgeAssetResolver, ContentLayout, DeletionManager, DownloadOrchestrator, DownloadQueue,
    ManifestStore,
};
use core_runtime::events::{EventBus, Receiver};
use tracing::{info, instrument};

struct ServiceInner {
    catalog: Arc<dyn ContentCatalog>,
    manifest: Arc<ManifestStore>,
    queue: Arc<DownloadQueue>,
    orchestrator: DownloadOrchestrator,
    deletion: DeletionManager,
    event_bus: Arc<EventBus>,
    content_dir: PathBuf,
}

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share the same manifest, queue and event bus.
#[derive(Clone)]
pub struct OfflineContentService {
    inner: Arc<ServiceInner>,
}

impl OfflineContentService {
    /// Load the manifest and wire the offline cache from bridge handles.
    ///
    /// The content directory is `config.content_dir` when set, otherwise
    /// `{data_dir}/{offline.content_directory}`.
    #[instrument(skip_all)]
    pub async fn bootstrap(config: CoreConfig, offline: OfflineConfig) -> Result<Self> {
        config.validate()?;
        offline
            .validate()
            .map_err(|e| CoreError::Offline(OfflineError::Config(e)))?;

        let content_dir = match &config.content_dir {
            Some(dir) => dir.clone(),
            None => config
                .file_system
                .get_data_directory()
                .await
                .map_err(|e| {
                    CoreError::InitializationFailed(format!("No data directory: {}", e))
                })?
                .join(&offline.content_directory),
        };
        config
            .file_system
            .create_dir_all(&content_dir)
            .await
            .map_err(|e| {
                CoreError::InitializationFailed(format!("Cannot create content directory: {}", e))
            })?;

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let manifest =
            Arc::new(ManifestStore::load(config.settings_store.clone(), &offline.manifest_key).await);
        let queue = Arc::new(DownloadQueue::new());

        let titles = manifest.titles().await.len();
        let _ = event_bus.emit(CoreEvent::Manifest(ManifestEvent::Loaded {
            title_count: titles,
            dropped_entries: manifest.dropped_on_load(),
        }));

        let mut resolver =
            BridgeAssetResolver::new(config.file_system.clone(), config.http_client.clone());
        if let Some(loader) = &config.asset_loader {
            resolver = resolver.with_asset_loader(loader.clone());
        }

        let layout = ContentLayout::new(content_dir.clone(), offline.default_extension.clone());
        let orchestrator = DownloadOrchestrator::new(
            manifest.clone(),
            queue.clone(),
            Arc::new(resolver),
            config.file_system.clone(),
            layout,
            &offline,
        )
        .with_event_bus(event_bus.clone());
        let deletion = DeletionManager::new(manifest.clone(), config.file_system.clone())
            .with_event_bus(event_bus.clone());

        info!(
            titles,
            policy = ?offline.failure_policy,
            "Offline content service ready"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                catalog: config.catalog,
                manifest,
                queue,
                orchestrator,
                deletion,
                event_bus,
                content_dir,
            }),
        })
    }

    /// Download chapters of a title using sources from the content catalog.
    pub async fn request_download(
        &self,
        title_id: &str,
        chapter_ids: &[String],
    ) -> Result<DownloadReport> {
        let sources = self
            .inner
            .catalog
            .get_sources(title_id)
            .await
            .map_err(|e| OfflineError::Catalog(e.to_string()))?;

        self.request_download_with_sources(title_id, chapter_ids, &sources)
            .await
    }

    /// Download chapters of a title from caller-supplied sources.
    pub async fn request_download_with_sources(
        &self,
        title_id: &str,
        chapter_ids: &[String],
        sources: &ChapterSourceSet,
    ) -> Result<DownloadReport> {
        Ok(self
            .inner
            .orchestrator
            .download(title_id, chapter_ids, sources)
            .await?)
    }

    pub async fn request_delete(&self, title_id: &str, chapter_id: &str) -> Result<DeletionReport> {
        Ok(self.inner.deletion.delete_chapter(title_id, chapter_id).await?)
    }

    pub async fn request_delete_title(&self, title_id: &str) -> Result<DeletionReport> {
        Ok(self.inner.deletion.delete_title(title_id).await?)
    }

    /// Downloaded chapters report from the manifest; anything else from the
    /// download queue.
    pub async fn chapter_status(&self, title_id: &str, chapter_id: &str) -> ChapterStatus {
        let status = self.inner.manifest.status(title_id, chapter_id).await;
        if status.state == ChapterState::Downloaded {
            return status;
        }

        self.inner
            .queue
            .status(title_id, chapter_id)
            .map(|entry| ChapterStatus::from_queue(&entry))
            .unwrap_or_else(ChapterStatus::none)
    }

    pub async fn download_summary(&self, title_id: &str, total_chapters: usize) -> DownloadSummary {
        self.inner
            .manifest
            .download_info(title_id, total_chapters)
            .await
    }

    pub async fn cover_path(&self, title_id: &str) -> Option<String> {
        self.inner.manifest.cover_path(title_id).await
    }

    pub async fn page_paths(&self, title_id: &str, chapter_id: &str) -> Option<Vec<String>> {
        self.inner.manifest.page_paths(title_id, chapter_id).await
    }

    pub async fn downloaded_titles(&self) -> Vec<String> {
        self.inner.manifest.titles().await
    }

    /// Subscribe to download, deletion and manifest events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.event_bus.subscribe()
    }

    /// Events concerning a single title.
    pub fn title_events(&self, title_id: impl Into<String>) -> EventStream {
        EventStream::new(self.subscribe()).for_title(title_id)
    }

    pub fn content_dir(&self) -> &Path {
        &self.inner.content_dir
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// File system, HTTP client and settings store come from `bridge-desktop`;
/// bundled assets are resolved from `asset_root`.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example(catalog: std::sync::Arc<dyn bridge_traits::ContentCatalog>) -> core_service::Result<()> {
/// use core_service::{bootstrap_desktop, OfflineConfig};
///
/// let service = bootstrap_desktop(catalog, "/opt/reader/assets", OfflineConfig::default()).await?;
/// let report = service.request_download("t1", &["c1".to_string()]).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    catalog: Arc<dyn ContentCatalog>,
    asset_root: impl Into<PathBuf>,
    offline: OfflineConfig,
) -> Result<OfflineContentService> {
    let config = CoreConfig::builder()
        .catalog(catalog)
        .asset_loader(Arc::new(DirectoryAssetLoader::new(asset_root)))
        .build()?;

    OfflineContentService::bootstrap(config, offline).await
}
