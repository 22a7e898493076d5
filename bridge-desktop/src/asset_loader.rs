//! Bundled Asset Loader backed by an on-disk asset directory

use async_trait::async_trait;
use bridge_traits::{
    assets::AssetLoader,
    error::{BridgeError, Result},
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Resolves bundled module references to `file://` URIs inside an asset directory.
///
/// A module reference is either an id registered with [`with_module`](Self::with_module)
/// or a relative path under the asset root. Paths escaping the root are rejected.
pub struct DirectoryAssetLoader {
    root: PathBuf,
    modules: HashMap<String, PathBuf>,
}

impl DirectoryAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modules: HashMap::new(),
        }
    }

    /// Register a module id (e.g. a numeric bundler id) for a file relative to the root
    pub fn with_module(mut self, module_ref: impl Into<String>, relative: impl Into<PathBuf>) -> Self {
        self.modules.insert(module_ref.into(), relative.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_path(&self, module_ref: &str) -> Result<PathBuf> {
        let relative = self
            .modules
            .get(module_ref)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(module_ref));

        let escapes_root = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes_root {
            return Err(BridgeError::OperationFailed(format!(
                "Module reference escapes asset root: {}",
                module_ref
            )));
        }

        Ok(relative)
    }
}

#[async_trait]
impl AssetLoader for DirectoryAssetLoader {
    async fn resolve_to_local_uri(&self, module_ref: &str) -> Result<String> {
        let path = self.root.join(self.relative_path(module_ref)?);

        if !fs::try_exists(&path).await.map_err(BridgeError::Io)? {
            return Err(BridgeError::NotFound(format!(
                "Bundled asset {} ({})",
                module_ref,
                path.display()
            )));
        }

        debug!(module_ref = module_ref, path = ?path, "Resolved bundled asset");
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn asset_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("reader-core-assets-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(root.join("covers")).await.unwrap();
        fs::write(root.join("covers").join("t1.png"), b"png").await.unwrap();
        root
    }

    #[tokio::test]
    async fn test_resolves_relative_path() {
        let root = asset_root().await;
        let loader = DirectoryAssetLoader::new(root.clone());

        let uri = loader.resolve_to_local_uri("covers/t1.png").await.unwrap();
        assert_eq!(
            uri,
            format!("file://{}", root.join("covers/t1.png").display())
        );

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_resolves_registered_module_id() {
        let root = asset_root().await;
        let loader = DirectoryAssetLoader::new(root.clone()).with_module("12", "covers/t1.png");

        let uri = loader.resolve_to_local_uri("12").await.unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("t1.png"));

        fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_missing_and_escaping_refs_fail() {
        let root = asset_root().await;
        let loader = DirectoryAssetLoader::new(root.clone());

        let missing = loader.resolve_to_local_uri("covers/none.png").await.unwrap_err();
        assert!(missing.is_not_found());

        let escaping = loader.resolve_to_local_uri("../secret.png").await.unwrap_err();
        assert!(!escaping.is_not_found());

        fs::remove_dir_all(&root).await.ok();
    }
}
