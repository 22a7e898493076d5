//! # Download Queue
//!
//! Transient per-(title, chapter) status and progress. Never persisted; an
//! app restart forgets everything in flight.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::models::{QueueEntry, QueueStatus};

type Key = (String, String);

/// Split of a request's chapter ids after enqueueing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// Newly queued by this request, in request order
    pub queued: Vec<String>,
    pub already_downloaded: Vec<String>,
    /// Already queued or downloading for another request
    pub in_flight: Vec<String>,
}

/// In-memory download queue.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    entries: Mutex<HashMap<Key, QueueEntry>>,
}

fn key(title_id: &str, chapter_id: &str) -> Key {
    (title_id.to_string(), chapter_id.to_string())
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every chapter that is neither downloaded nor already in flight.
    ///
    /// Ids repeated within one request are queued once.
    pub fn enqueue(
        &self,
        title_id: &str,
        chapter_ids: &[String],
        downloaded: &HashSet<String>,
    ) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome::default();
        let mut seen = HashSet::new();
        let mut entries = self.entries.lock();

        for chapter_id in chapter_ids {
            if !seen.insert(chapter_id.as_str()) {
                continue;
            }
            if downloaded.contains(chapter_id) {
                outcome.already_downloaded.push(chapter_id.clone());
                continue;
            }
            let k = key(title_id, chapter_id);
            if entries.contains_key(&k) {
                outcome.in_flight.push(chapter_id.clone());
                continue;
            }
            entries.insert(k, QueueEntry::queued());
            outcome.queued.push(chapter_id.clone());
        }

        outcome
    }

    pub fn set_downloading(&self, title_id: &str, chapter_id: &str, total_pages: usize) {
        if let Some(entry) = self.entries.lock().get_mut(&key(title_id, chapter_id)) {
            entry.status = QueueStatus::Downloading;
            entry.total_pages = total_pages;
            entry.completed_pages = 0;
            entry.progress = 0.0;
        }
    }

    /// Update progress; a no-op when the entry is gone.
    ///
    /// `fraction` is clamped to `[0, 1]`.
    pub fn set_progress(&self, title_id: &str, chapter_id: &str, fraction: f64) {
        if let Some(entry) = self.entries.lock().get_mut(&key(title_id, chapter_id)) {
            let fraction = if fraction.is_nan() {
                0.0
            } else {
                fraction.clamp(0.0, 1.0)
            };
            entry.progress = fraction;
            entry.completed_pages = (fraction * entry.total_pages as f64).round() as usize;
        }
    }

    pub fn clear(&self, title_id: &str, chapter_id: &str) -> Option<QueueEntry> {
        self.entries.lock().remove(&key(title_id, chapter_id))
    }

    pub fn status(&self, title_id: &str, chapter_id: &str) -> Option<QueueEntry> {
        self.entries.lock().get(&key(title_id, chapter_id)).cloned()
    }

    /// In-flight chapters of a title, sorted by chapter id.
    pub fn entries_for_title(&self, title_id: &str) -> Vec<(String, QueueEntry)> {
        let mut found: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|((title, _), _)| title == title_id)
            .map(|((_, chapter), entry)| (chapter.clone(), entry.clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
