//! Local file naming for downloaded content
//!
//! All files live flat in one content directory:
//! `{title}-cover.{ext}` and `{title}-{chapter}-p{index}.{ext}`.

use bridge_traits::AssetRef;
use std::path::{Path, PathBuf};

/// Escape an id for use as one segment of a flat file name.
///
/// ASCII alphanumerics, `_` and `.` are kept; every other byte of the UTF-8
/// encoding becomes `%XX`. Since `-` is escaped it only ever appears as the
/// separator in the layout, so distinct `(title, chapter)` pairs never share
/// a file. The ids `.` and `..` are escaped whole and the empty id maps to
/// a lone `%`.
pub fn escape_id(id: &str) -> String {
    if id.is_empty() {
        return "%".to_string();
    }
    let whole = matches!(id, "." | "..");

    let mut escaped = String::with_capacity(id.len());
    for byte in id.bytes() {
        if !whole && (byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.')) {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}

/// Target paths for covers and pages under the content directory.
#[derive(Debug, Clone)]
pub struct ContentLayout {
    root: PathBuf,
    default_extension: String,
}

impl ContentLayout {
    pub fn new(root: impl Into<PathBuf>, default_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_extension: default_extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cover_path(&self, title_id: &str, asset: &AssetRef) -> PathBuf {
        self.root.join(format!(
            "{}-cover.{}",
            escape_id(title_id),
            self.extension_for(asset)
        ))
    }

    pub fn page_path(
        &self,
        title_id: &str,
        chapter_id: &str,
        page_index: usize,
        asset: &AssetRef,
    ) -> PathBuf {
        self.root.join(format!(
            "{}-{}-p{}.{}",
            escape_id(title_id),
            escape_id(chapter_id),
            page_index,
            self.extension_for(asset)
        ))
    }

    fn extension_for<'a>(&'a self, asset: &AssetRef) -> &'a str {
        asset
            .extension_hint()
            .unwrap_or(self.default_extension.as_str())
    }
}
