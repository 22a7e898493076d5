//! # Asset Resolver
//!
//! Materializes an [`AssetRef`] at a local path. Remote assets are fetched
//! over HTTP; bundled assets are first resolved to a URI by the platform
//! [`AssetLoader`] and then copied (or fetched, for development bundlers
//! serving over HTTP).

use async_trait::async_trait;
use bridge_traits::{
    assets::is_http_url, AssetLoader, AssetRef, FileSystemAccess, HttpClient, HttpRequest,
};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{OfflineError, Result};

/// Writes an asset's bytes to a local path.
///
/// Materializing the same asset to the same path twice overwrites.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn materialize(&self, asset: &AssetRef, target: &Path) -> Result<()>;
}

/// [`AssetResolver`] built on the host bridges.
pub struct BridgeAssetResolver {
    fs: Arc<dyn FileSystemAccess>,
    http: Arc<dyn HttpClient>,
    loader: Option<Arc<dyn AssetLoader>>,
    resolved_uris: Mutex<HashMap<String, String>>,
}

impl BridgeAssetResolver {
    pub fn new(fs: Arc<dyn FileSystemAccess>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            fs,
            http,
            loader: None,
            resolved_uris: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Bytes, String> {
        let response = self
            .http
            .execute(HttpRequest::get(url))
            .await
            .map_err(|e| e.to_string())?;

        if !response.is_success() {
            return Err(format!("HTTP {}", response.status));
        }
        Ok(response.body)
    }

    async fn resolve_bundled(&self, module_ref: &str) -> std::result::Result<String, String> {
        if let Some(uri) = self.resolved_uris.lock().get(module_ref).cloned() {
            return Ok(uri);
        }

        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| "no asset loader configured".to_string())?;
        let uri = loader
            .resolve_to_local_uri(module_ref)
            .await
            .map_err(|e| format!("asset loader: {}", e))?;

        debug!(module_ref, uri = %uri, "Resolved bundled asset");
        self.resolved_uris
            .lock()
            .insert(module_ref.to_string(), uri.clone());
        Ok(uri)
    }

    async fn materialize_inner(
        &self,
        asset: &AssetRef,
        target: &Path,
    ) -> std::result::Result<(), String> {
        if let Some(parent) = target.parent() {
            self.fs
                .create_dir_all(parent)
                .await
                .map_err(|e| format!("create directory: {}", e))?;
        }

        match asset {
            AssetRef::Remote { url } => {
                let body = self.fetch(url).await?;
                self.write(target, body).await
            }
            AssetRef::Bundled { module_ref } => {
                let uri = self.resolve_bundled(module_ref).await?;
                if is_http_url(&uri) {
                    let body = self.fetch(&uri).await?;
                    self.write(target, body).await
                } else {
                    let source = local_path_from_uri(&uri);
                    self.fs
                        .copy_file(&source, target)
                        .await
                        .map_err(|e| format!("copy: {}", e))
                }
            }
        }
    }

    async fn write(&self, target: &Path, body: Bytes) -> std::result::Result<(), String> {
        self.fs
            .write_file(target, body)
            .await
            .map_err(|e| format!("write: {}", e))
    }
}

#[async_trait]
impl AssetResolver for BridgeAssetResolver {
    #[instrument(skip(self, asset, target), fields(asset = %asset.describe(), file = %strip_path(&target.to_string_lossy())))]
    async fn materialize(&self, asset: &AssetRef, target: &Path) -> Result<()> {
        self.materialize_inner(asset, target)
            .await
            .map_err(|reason| OfflineError::MaterializeFailed {
                asset: asset.describe(),
                target: target.display().to_string(),
                reason,
            })
    }
}

/// `file:///a/b.png` and plain paths both map to a filesystem path.
fn local_path_from_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}
