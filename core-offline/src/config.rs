//! Offline cache configuration and policies

use serde::{Deserialize, Serialize};

/// Configuration for the offline content cache.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Settings-store key holding the manifest document (default: "offline_manifest")
    pub manifest_key: String,

    /// Content directory, relative to the app data directory (default: "offline_content")
    pub content_directory: String,

    /// What a failed chapter does to the rest of its request
    pub failure_policy: FailurePolicy,

    /// Download requests processed at the same time (default: 2)
    pub max_concurrent_requests: usize,

    /// Extension used when an asset reference carries none (default: "jpg")
    pub default_extension: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            manifest_key: "offline_manifest".to_string(),
            content_directory: "offline_content".to_string(),
            failure_policy: FailurePolicy::default(),
            max_concurrent_requests: 2,
            default_extension: "jpg".to_string(),
        }
    }
}

impl OfflineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest_key(mut self, key: impl Into<String>) -> Self {
        self.manifest_key = key.into();
        self
    }

    pub fn with_content_directory(mut self, dir: impl Into<String>) -> Self {
        self.content_directory = dir.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_concurrent_requests(mut self, count: usize) -> Self {
        self.max_concurrent_requests = count;
        self
    }

    pub fn with_default_extension(mut self, ext: impl Into<String>) -> Self {
        self.default_extension = ext.into();
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.manifest_key.trim().is_empty() {
            return Err("manifest_key cannot be empty".to_string());
        }

        if self.content_directory.trim().is_empty() {
            return Err("content_directory cannot be empty".to_string());
        }

        if self.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be at least 1".to_string());
        }

        if self.default_extension.is_empty()
            || !self
                .default_extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(format!(
                "default_extension must be alphanumeric, got '{}'",
                self.default_extension
            ));
        }

        Ok(())
    }
}

/// How a failed chapter affects the other chapters of the same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Roll back the failed chapter and keep going with its siblings.
    #[default]
    IsolateChapter,
    /// Stop at the first failed chapter; the rest of the request is dropped.
    AbortBatch,
}

impl FailurePolicy {
    pub fn description(&self) -> &'static str {
        match self {
            FailurePolicy::IsolateChapter => "Failed chapters are rolled back individually",
            FailurePolicy::AbortBatch => "The first failed chapter aborts the request",
        }
    }
}
