//! Data types shared by the manifest, queue and service layers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::OfflineError;

/// Durable record of one downloaded title.
///
/// Serialized as `{"coverPath": "...", "chapters": {"<id>": ["<page path>", ...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub cover_path: String,
    #[serde(default)]
    pub chapters: BTreeMap<String, Vec<String>>,
}

impl ManifestEntry {
    pub fn new(cover_path: impl Into<String>) -> Self {
        Self {
            cover_path: cover_path.into(),
            chapters: BTreeMap::new(),
        }
    }

    /// An entry is usable only with a cover and at least one page per chapter.
    pub fn is_valid(&self) -> bool {
        !self.cover_path.is_empty() && self.chapters.values().all(|pages| !pages.is_empty())
    }
}

/// Queue status of an in-flight chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    Downloading,
}

/// Transient per-chapter download state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub status: QueueStatus,
    /// Fraction of pages completed, within `[0, 1]`
    pub progress: f64,
    pub total_pages: usize,
    pub completed_pages: usize,
}

impl QueueEntry {
    pub fn queued() -> Self {
        Self {
            status: QueueStatus::Queued,
            progress: 0.0,
            total_pages: 0,
            completed_pages: 0,
        }
    }
}

/// Externally visible state of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterState {
    None,
    Queued,
    Downloading,
    Downloaded,
}

/// Chapter state plus progress fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChapterStatus {
    pub state: ChapterState,
    pub progress: f64,
}

impl ChapterStatus {
    pub fn none() -> Self {
        Self {
            state: ChapterState::None,
            progress: 0.0,
        }
    }

    pub fn downloaded() -> Self {
        Self {
            state: ChapterState::Downloaded,
            progress: 1.0,
        }
    }

    pub fn from_queue(entry: &QueueEntry) -> Self {
        let state = match entry.status {
            QueueStatus::Queued => ChapterState::Queued,
            QueueStatus::Downloading => ChapterState::Downloading,
        };
        Self {
            state,
            progress: entry.progress,
        }
    }
}

/// How much of a title is available offline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadSummary {
    pub downloaded_count: usize,
    pub progress: f64,
}

impl DownloadSummary {
    /// Builds a summary from a downloaded count and a chapter total.
    ///
    /// Progress is `0` when the total is `0` and never exceeds `1`.
    pub fn new(downloaded_count: usize, total_chapters: usize) -> Self {
        let progress = if total_chapters == 0 {
            0.0
        } else {
            (downloaded_count as f64 / total_chapters as f64).min(1.0)
        };
        Self {
            downloaded_count,
            progress,
        }
    }
}

/// A chapter that was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterFailure {
    pub chapter_id: String,
    /// Index of the failing page; `None` when the cover or the source lookup failed
    pub page_index: Option<usize>,
    pub reason: String,
}

/// A requested chapter the catalog had no pages for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedChapter {
    pub chapter_id: String,
    pub reason: String,
}

/// Outcome of one download request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    pub title_id: String,
    /// Chapters committed to the manifest by this request
    pub committed: Vec<String>,
    /// Chapters that were already downloaded before the request
    pub already_downloaded: Vec<String>,
    /// Chapters already queued or downloading from an earlier request
    pub in_flight: Vec<String>,
    /// Chapters with no page sources
    pub skipped: Vec<SkippedChapter>,
    pub failed: Vec<ChapterFailure>,
    /// Chapters never attempted because the batch was aborted
    pub aborted: Vec<String>,
    /// Manifest writes that failed after the in-memory update
    pub persistence_warnings: Vec<String>,
}

impl DownloadReport {
    pub fn new(title_id: impl Into<String>) -> Self {
        Self {
            title_id: title_id.into(),
            ..Default::default()
        }
    }

    pub fn skipped_ids(&self) -> Vec<String> {
        self.skipped.iter().map(|s| s.chapter_id.clone()).collect()
    }

    /// `true` when no chapter failed or was aborted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_empty()
    }
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub title_id: String,
    pub removed_chapters: Vec<String>,
    pub files_deleted: usize,
    /// Files that were already gone
    pub files_missing: usize,
    /// Files whose deletion failed for another reason
    pub file_errors: Vec<String>,
    pub cover_deleted: bool,
    pub title_removed: bool,
}

impl DeletionReport {
    pub fn new(title_id: impl Into<String>) -> Self {
        Self {
            title_id: title_id.into(),
            ..Default::default()
        }
    }

    pub(crate) fn merge(&mut self, other: DeletionReport) {
        self.removed_chapters.extend(other.removed_chapters);
        self.files_deleted += other.files_deleted;
        self.files_missing += other.files_missing;
        self.file_errors.extend(other.file_errors);
        self.cover_deleted |= other.cover_deleted;
        self.title_removed |= other.title_removed;
    }
}

/// Result of a manifest mutation.
///
/// The mutation is always applied in memory; `persistence_warning` is set
/// when the durable write failed.
#[derive(Debug)]
pub struct MutationOutcome<T> {
    pub value: T,
    pub persistence_warning: Option<OfflineError>,
}

impl<T> MutationOutcome<T> {
    pub fn persisted(value: T) -> Self {
        Self {
            value,
            persistence_warning: None,
        }
    }
}

/// What was removed from the manifest for one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedChapter {
    pub page_paths: Vec<String>,
    /// Cover path, set when the title has no chapters left and was dropped
    pub orphaned_cover: Option<String>,
}
