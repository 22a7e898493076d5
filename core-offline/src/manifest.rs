//! # Manifest Store
//!
//! Durable record of downloaded content: per title, a cover path and a map
//! of chapter id to ordered local page paths. The whole manifest is one JSON
//! document under a single settings key, rewritten on every mutation.
//!
//! The in-memory copy is authoritative. A failed flush never rolls back a
//! mutation; it is reported as a [`PersistenceFailed`](OfflineError::PersistenceFailed)
//! warning in the returned [`MutationOutcome`].

use bridge_traits::SettingsStore;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{OfflineError, Result};
use crate::models::{ChapterStatus, DownloadSummary, ManifestEntry, MutationOutcome, RemovedChapter};

type Entries = BTreeMap<String, ManifestEntry>;

/// Persistent manifest of downloaded titles and chapters.
pub struct ManifestStore {
    settings: Arc<dyn SettingsStore>,
    key: String,
    entries: Mutex<Entries>,
    dropped_on_load: usize,
}

impl ManifestStore {
    /// Load the manifest stored under `key`.
    ///
    /// Missing, unreadable or corrupt data yields an empty manifest. Entries
    /// without a cover or with an empty chapter page list are dropped.
    #[instrument(skip(settings))]
    pub async fn load(settings: Arc<dyn SettingsStore>, key: &str) -> Self {
        let raw = match settings.get_string(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read offline manifest, starting empty");
                None
            }
        };

        let (entries, dropped_on_load) = match raw {
            Some(raw) => parse_manifest(&raw),
            None => {
                debug!("No offline manifest stored yet");
                (Entries::new(), 0)
            }
        };

        debug!(
            titles = entries.len(),
            dropped = dropped_on_load,
            "Offline manifest loaded"
        );

        Self {
            settings,
            key: key.to_string(),
            entries: Mutex::new(entries),
            dropped_on_load,
        }
    }

    /// Number of malformed entries discarded by [`load`](Self::load).
    pub fn dropped_on_load(&self) -> usize {
        self.dropped_on_load
    }

    /// Downloaded/1.0 iff a non-empty page list is recorded for the chapter.
    pub async fn status(&self, title_id: &str, chapter_id: &str) -> ChapterStatus {
        let entries = self.entries.lock().await;
        match entries
            .get(title_id)
            .and_then(|entry| entry.chapters.get(chapter_id))
        {
            Some(pages) if !pages.is_empty() => ChapterStatus::downloaded(),
            _ => ChapterStatus::none(),
        }
    }

    pub async fn cover_path(&self, title_id: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries.get(title_id).map(|entry| entry.cover_path.clone())
    }

    pub async fn page_paths(&self, title_id: &str, chapter_id: &str) -> Option<Vec<String>> {
        let entries = self.entries.lock().await;
        entries
            .get(title_id)
            .and_then(|entry| entry.chapters.get(chapter_id))
            .cloned()
    }

    pub async fn downloaded_chapters(&self, title_id: &str) -> HashSet<String> {
        let entries = self.entries.lock().await;
        entries
            .get(title_id)
            .map(|entry| entry.chapters.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of every title with downloaded content, sorted.
    pub async fn titles(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }

    pub async fn download_info(&self, title_id: &str, total_chapters: usize) -> DownloadSummary {
        let entries = self.entries.lock().await;
        let downloaded = entries
            .get(title_id)
            .map(|entry| entry.chapters.len())
            .unwrap_or(0);
        DownloadSummary::new(downloaded, total_chapters)
    }

    /// Record a fully downloaded chapter and persist the manifest.
    ///
    /// Overwrites an existing page list for the chapter. The cover path is
    /// set only when the title has none yet.
    #[instrument(skip(self, page_paths, cover_path), fields(pages = page_paths.len()))]
    pub async fn commit_chapter(
        &self,
        title_id: &str,
        chapter_id: &str,
        page_paths: Vec<String>,
        cover_path: &str,
    ) -> Result<MutationOutcome<()>> {
        if page_paths.is_empty() {
            return Err(OfflineError::Internal(format!(
                "Refusing to commit chapter {} of {} without pages",
                chapter_id, title_id
            )));
        }

        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(title_id.to_string())
            .or_insert_with(|| ManifestEntry::new(cover_path));
        if entry.cover_path.is_empty() {
            entry.cover_path = cover_path.to_string();
        }
        entry.chapters.insert(chapter_id.to_string(), page_paths);

        let warning = self.flush(&entries).await.err();
        Ok(MutationOutcome {
            value: (),
            persistence_warning: warning,
        })
    }

    /// Remove a chapter and persist the manifest.
    ///
    /// Returns `None` when the chapter was not recorded (nothing is written).
    /// When the title has no chapters left its entry is dropped and the
    /// cover path is handed back for deletion.
    #[instrument(skip(self))]
    pub async fn remove_chapter(
        &self,
        title_id: &str,
        chapter_id: &str,
    ) -> MutationOutcome<Option<RemovedChapter>> {
        let mut entries = self.entries.lock().await;

        let Some(entry) = entries.get_mut(title_id) else {
            return MutationOutcome::persisted(None);
        };
        let Some(page_paths) = entry.chapters.remove(chapter_id) else {
            return MutationOutcome::persisted(None);
        };

        let orphaned_cover = if entry.chapters.is_empty() {
            entries.remove(title_id).map(|removed| removed.cover_path)
        } else {
            None
        };

        let warning = self.flush(&entries).await.err();
        MutationOutcome {
            value: Some(RemovedChapter {
                page_paths,
                orphaned_cover,
            }),
            persistence_warning: warning,
        }
    }

    /// Write the whole document. Called with the entries lock held so
    /// concurrent flushes never interleave.
    async fn flush(&self, entries: &Entries) -> Result<()> {
        let json = serde_json::to_string(entries)
            .map_err(|e| OfflineError::PersistenceFailed(format!("serialize: {}", e)))?;

        self.settings
            .set_string(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, key = %self.key, "Failed to persist offline manifest");
                OfflineError::PersistenceFailed(e.to_string())
            })
    }
}

/// Parse a stored manifest, dropping malformed entries.
fn parse_manifest(raw: &str) -> (Entries, usize) {
    let document: Map<String, Value> = match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!("Offline manifest is not a JSON object, starting empty");
            return (Entries::new(), 0);
        }
        Err(e) => {
            warn!(error = %e, "Offline manifest is corrupt, starting empty");
            return (Entries::new(), 0);
        }
    };

    let mut entries = Entries::new();
    let mut dropped = 0;
    for (title_id, value) in document {
        match serde_json::from_value::<ManifestEntry>(value) {
            Ok(entry) if entry.is_valid() && !entry.chapters.is_empty() => {
                entries.insert(title_id, entry);
            }
            Ok(_) => {
                warn!(title_id = %title_id, "Dropping incomplete manifest entry");
                dropped += 1;
            }
            Err(e) => {
                warn!(title_id = %title_id, error = %e, "Dropping malformed manifest entry");
                dropped += 1;
            }
        }
    }

    (entries, dropped)
}
