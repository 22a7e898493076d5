//! Asset References and Platform Asset Loading
//!
//! Page and cover images come from one of two places: a remote URL, or an
//! asset bundled with the client binary that the platform must first expose
//! as a locally addressable URI. Hosts describe assets loosely (an object
//! with a `uri`, or a bare module id); [`AssetRef::from_descriptor`] converts
//! such a descriptor into the explicit [`AssetRef`] enum once, at the boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{BridgeError, Result};

const KNOWN_IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "jpg"),
    ("jpeg", "jpg"),
    ("png", "png"),
    ("webp", "webp"),
    ("gif", "gif"),
    ("avif", "avif"),
    ("bmp", "bmp"),
];

/// Reference to a page or cover image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetRef {
    /// Fetchable over the network.
    Remote { url: String },
    /// Packaged with the client; resolved through an [`AssetLoader`].
    Bundled { module_ref: String },
}

impl AssetRef {
    pub fn remote(url: impl Into<String>) -> Self {
        AssetRef::Remote { url: url.into() }
    }

    pub fn bundled(module_ref: impl Into<String>) -> Self {
        AssetRef::Bundled {
            module_ref: module_ref.into(),
        }
    }

    /// Convert a host-provided asset descriptor into an `AssetRef`.
    ///
    /// Accepted shapes:
    /// - `{"kind": "remote", "url": ...}` / `{"kind": "bundled", "module_ref": ...}`
    /// - `{"uri": "..."}` or `{"url": "..."}` → `Remote`
    /// - a number (module id) → `Bundled`
    /// - a string with an `http(s)://` scheme → `Remote`, any other string → `Bundled`
    pub fn from_descriptor(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) if map.contains_key("kind") => {
                serde_json::from_value(value.clone()).map_err(|e| {
                    BridgeError::OperationFailed(format!("Invalid asset descriptor: {}", e))
                })
            }
            Value::Object(map) => map
                .get("uri")
                .or_else(|| map.get("url"))
                .and_then(Value::as_str)
                .map(AssetRef::remote)
                .ok_or_else(|| {
                    BridgeError::OperationFailed(
                        "Asset descriptor object has no uri/url".to_string(),
                    )
                }),
            Value::Number(n) => Ok(AssetRef::bundled(n.to_string())),
            Value::String(s) if is_http_url(s) => Ok(AssetRef::remote(s.clone())),
            Value::String(s) if !s.is_empty() => Ok(AssetRef::bundled(s.clone())),
            other => Err(BridgeError::OperationFailed(format!(
                "Unrecognized asset descriptor: {}",
                other
            ))),
        }
    }

    /// Image file extension derived from the URL or module reference.
    ///
    /// Query strings and fragments are ignored; `jpeg` normalizes to `jpg`.
    pub fn extension_hint(&self) -> Option<&'static str> {
        let raw = match self {
            AssetRef::Remote { url } => url.as_str(),
            AssetRef::Bundled { module_ref } => module_ref.as_str(),
        };
        image_extension(raw)
    }

    /// Short human-readable description for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            AssetRef::Remote { url } => format!("remote:{}", url),
            AssetRef::Bundled { module_ref } => format!("bundled:{}", module_ref),
        }
    }
}

/// Returns `true` for `http://` and `https://` URLs.
pub fn is_http_url(s: &str) -> bool {
    let lower = s.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Extract a known image extension from a path or URL.
pub fn image_extension(raw: &str) -> Option<&'static str> {
    let without_query = raw.split(['?', '#']).next().unwrap_or(raw);
    let last_segment = without_query.rsplit('/').next().unwrap_or(without_query);
    let (_, ext) = last_segment.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();

    KNOWN_IMAGE_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, normalized)| *normalized)
}

/// Sources for one download request: the title's cover and each chapter's
/// ordered page references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSourceSet {
    pub cover: AssetRef,
    #[serde(default)]
    pub pages: HashMap<String, Vec<AssetRef>>,
}

impl ChapterSourceSet {
    pub fn new(cover: AssetRef) -> Self {
        Self {
            cover,
            pages: HashMap::new(),
        }
    }

    /// Add (or replace) the ordered pages of a chapter.
    pub fn with_chapter(mut self, chapter_id: impl Into<String>, pages: Vec<AssetRef>) -> Self {
        self.pages.insert(chapter_id.into(), pages);
        self
    }

    /// Pages of a chapter, `None` when the chapter has no entry.
    pub fn pages_for(&self, chapter_id: &str) -> Option<&[AssetRef]> {
        self.pages.get(chapter_id).map(Vec::as_slice)
    }
}

/// Platform asset loader
///
/// Resolves a bundled module reference to a URI the core can read from:
/// - Desktop: a file inside the application's asset directory
/// - Mobile: the platform's asset bundle, extracted on first access
/// - Development builds: possibly an `http://` URL served by the bundler
///
/// Resolution is idempotent; implementations may cache results.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Resolve a module reference to a local URI (`file://...`, plain path, or `http(s)://...`).
    async fn resolve_to_local_uri(&self, module_ref: &str) -> Result<String>;
}
