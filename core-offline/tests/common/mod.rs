//! In-memory bridge fakes shared by the offline cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    AssetLoader, AssetRef, ChapterSourceSet, FileMetadata, FileSystemAccess, HttpClient,
    HttpRequest, HttpResponse, SettingsStore,
};
use bytes::Bytes;
use core_offline::{
    AssetResolver, BridgeAssetResolver, ContentLayout, DeletionManager, DownloadOrchestrator,
    DownloadQueue, ManifestStore, OfflineConfig, Result as OfflineResult,
};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const CONTENT_DIR: &str = "/data/offline_content";
pub const MANIFEST_KEY: &str = "offline_manifest";

// ============================================================================
// Mock Implementations
// ============================================================================

#[derive(Default)]
pub struct MemoryFs {
    pub files: Mutex<HashMap<PathBuf, Bytes>>,
    pub undeletable: Mutex<HashSet<PathBuf>>,
}

impl MemoryFs {
    pub fn has(&self, path: &str) -> bool {
        self.files.lock().contains_key(Path::new(path))
    }

    pub fn count(&self) -> usize {
        self.files.lock().len()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFs {
    async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
        Ok(PathBuf::from("/data"))
    }

    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        Ok(self.files.lock().contains_key(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        self.files
            .lock()
            .get(path)
            .map(|data| FileMetadata {
                size: data.len() as u64,
                modified_at: None,
                is_directory: false,
            })
            .ok_or_else(|| BridgeError::NotFound(path.display().to_string()))
    }

    async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(path.display().to_string()))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.files.lock().insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        if self.undeletable.lock().contains(path) {
            return Err(BridgeError::OperationFailed("permission denied".to_string()));
        }
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BridgeError::NotFound(path.display().to_string()))
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}

/// Serves `https://cdn/<name>` with the name as body; URLs registered via
/// `fail` answer with the given status. Every request is logged.
#[derive(Default)]
pub struct FakeHttp {
    pub failures: Mutex<HashMap<String, u16>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn fail(&self, url: &str, status: u16) {
        self.failures.lock().insert(url.to_string(), status);
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().push(request.url.clone());
        let status = self.failures.lock().get(&request.url).copied().unwrap_or(200);
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(request.url.into_bytes()),
        })
    }
}

#[derive(Default)]
pub struct MemorySettings {
    pub values: Mutex<HashMap<String, String>>,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("database is locked".to_string()));
        }
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.values.lock().keys().cloned().collect())
    }
}

/// Resolves module refs to `/bundle/<ref>.png` and counts calls.
#[derive(Default)]
pub struct CountingLoader {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AssetLoader for CountingLoader {
    async fn resolve_to_local_uri(&self, module_ref: &str) -> BridgeResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("file:///bundle/{}.png", module_ref))
    }
}

/// Pauses a download just before one target file is written.
#[derive(Default)]
pub struct Gate {
    reached: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until a download blocks on this gate.
    pub async fn reached(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.reached.notified())
            .await
            .expect("download never reached the gate");
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Wraps the bridge resolver and holds writes to gated file names.
pub struct GatedResolver {
    inner: BridgeAssetResolver,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl GatedResolver {
    pub fn new(inner: BridgeAssetResolver) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn gate(&self, file_name: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .insert(file_name.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl AssetResolver for GatedResolver {
    async fn materialize(&self, asset: &AssetRef, target: &Path) -> OfflineResult<()> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let gate = self.gates.lock().remove(&name);
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        self.inner.materialize(asset, target).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub fs: Arc<MemoryFs>,
    pub http: Arc<FakeHttp>,
    pub settings: Arc<MemorySettings>,
    pub loader: Arc<CountingLoader>,
    pub manifest: Arc<ManifestStore>,
    pub queue: Arc<DownloadQueue>,
    pub event_bus: Arc<EventBus>,
    pub resolver: Arc<GatedResolver>,
    pub orchestrator: Arc<DownloadOrchestrator>,
    pub deletion: DeletionManager,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(OfflineConfig::default()).await
    }

    pub async fn with_config(config: OfflineConfig) -> Self {
        Self::build(
            config,
            Arc::new(MemoryFs::default()),
            Arc::new(MemorySettings::default()),
        )
        .await
    }

    /// Build a fresh harness over existing storage, as after an app restart.
    pub async fn restart(&self) -> Self {
        Self::build(
            OfflineConfig::default(),
            self.fs.clone(),
            self.settings.clone(),
        )
        .await
    }

    async fn build(config: OfflineConfig, fs: Arc<MemoryFs>, settings: Arc<MemorySettings>) -> Self {
        let http = Arc::new(FakeHttp::default());
        let loader = Arc::new(CountingLoader::default());
        let event_bus = Arc::new(EventBus::new(256));

        let manifest = Arc::new(ManifestStore::load(settings.clone(), MANIFEST_KEY).await);
        let queue = Arc::new(DownloadQueue::new());
        let resolver = Arc::new(GatedResolver::new(
            BridgeAssetResolver::new(fs.clone(), http.clone()).with_asset_loader(loader.clone()),
        ));
        let layout = ContentLayout::new(CONTENT_DIR, config.default_extension.clone());

        let orchestrator = DownloadOrchestrator::new(
            manifest.clone(),
            queue.clone(),
            resolver.clone(),
            fs.clone(),
            layout,
            &config,
        )
        .with_event_bus(event_bus.clone());
        let deletion =
            DeletionManager::new(manifest.clone(), fs.clone()).with_event_bus(event_bus.clone());

        Self {
            fs,
            http,
            settings,
            loader,
            manifest,
            queue,
            event_bus,
            resolver,
            orchestrator: Arc::new(orchestrator),
            deletion,
        }
    }

    /// Hold the next write of `file_name` until the returned gate is released.
    pub fn gate(&self, file_name: &str) -> Arc<Gate> {
        self.resolver.gate(file_name)
    }
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ============================================================================
// Source helpers
// ============================================================================

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn page_url(title: &str, chapter: &str, index: usize) -> String {
    format!("https://cdn/{}/{}/{}.jpg", title, chapter, index)
}

pub fn cover_url(title: &str) -> String {
    format!("https://cdn/{}/cover.jpg", title)
}

/// Remote sources with `pages` pages for each listed chapter.
pub fn sources(title: &str, chapters: &[(&str, usize)]) -> ChapterSourceSet {
    chapters.iter().fold(
        ChapterSourceSet::new(AssetRef::remote(cover_url(title))),
        |set, (chapter, pages)| {
            let refs = (0..*pages)
                .map(|i| AssetRef::remote(page_url(title, chapter, i)))
                .collect();
            set.with_chapter(*chapter, refs)
        },
    )
}

pub fn page_path(title: &str, chapter: &str, index: usize) -> String {
    format!("{}/{}-{}-p{}.jpg", CONTENT_DIR, title, chapter, index)
}

pub fn cover_path(title: &str) -> String {
    format!("{}/{}-cover.jpg", CONTENT_DIR, title)
}
