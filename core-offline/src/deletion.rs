//! # Deletion Manager
//!
//! Removes downloaded chapters from disk and from the manifest. When the
//! last chapter of a title goes, the cover file and the title entry go too.
//! Deletion does not consult the download queue.

use bridge_traits::FileSystemAccess;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, ManifestEvent};
use core_runtime::logging::strip_path;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{OfflineError, Result};
use crate::manifest::ManifestStore;
use crate::models::DeletionReport;

pub struct DeletionManager {
    manifest: Arc<ManifestStore>,
    fs: Arc<dyn FileSystemAccess>,
    event_bus: Option<Arc<EventBus>>,
}

impl DeletionManager {
    pub fn new(manifest: Arc<ManifestStore>, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            manifest,
            fs,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Delete one downloaded chapter.
    ///
    /// A chapter that is not downloaded is a successful no-op. Missing page
    /// files are tolerated; other file errors are logged and listed in the
    /// report.
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::PersistenceFailed`] when the manifest could not
    /// be written. Files and the in-memory manifest are already updated.
    #[instrument(skip(self))]
    pub async fn delete_chapter(&self, title_id: &str, chapter_id: &str) -> Result<DeletionReport> {
        let (report, warning) = self.remove_chapter_files(title_id, chapter_id).await;
        match warning {
            Some(warning) => Err(warning),
            None => Ok(report),
        }
    }

    /// Delete every downloaded chapter of a title, cover included.
    ///
    /// Every chapter is removed even when a manifest write fails; the first
    /// persistence failure is returned afterwards.
    #[instrument(skip(self))]
    pub async fn delete_title(&self, title_id: &str) -> Result<DeletionReport> {
        let mut chapters: Vec<String> = self
            .manifest
            .downloaded_chapters(title_id)
            .await
            .into_iter()
            .collect();
        chapters.sort();

        let mut report = DeletionReport::new(title_id);
        let mut first_warning = None;
        for chapter_id in chapters {
            let (chapter_report, warning) = self.remove_chapter_files(title_id, &chapter_id).await;
            report.merge(chapter_report);
            if first_warning.is_none() {
                first_warning = warning;
            }
        }

        match first_warning {
            Some(warning) => Err(warning),
            None => Ok(report),
        }
    }

    async fn remove_chapter_files(
        &self,
        title_id: &str,
        chapter_id: &str,
    ) -> (DeletionReport, Option<OfflineError>) {
        let mut report = DeletionReport::new(title_id);

        let Some(page_paths) = self.manifest.page_paths(title_id, chapter_id).await else {
            debug!(chapter_id, "Chapter not downloaded, nothing to delete");
            return (report, None);
        };

        for path in &page_paths {
            self.delete_file(path, &mut report).await;
        }

        let outcome = self.manifest.remove_chapter(title_id, chapter_id).await;
        if let Some(removed) = outcome.value {
            report.removed_chapters.push(chapter_id.to_string());
            self.emit(CoreEvent::Download(DownloadEvent::ChapterDeleted {
                title_id: title_id.to_string(),
                chapter_id: chapter_id.to_string(),
            }));

            if let Some(cover) = removed.orphaned_cover {
                report.cover_deleted = self.delete_file(&cover, &mut report).await;
                report.title_removed = true;
                info!(title_id, "Last chapter removed, title dropped from manifest");
                self.emit(CoreEvent::Download(DownloadEvent::TitleRemoved {
                    title_id: title_id.to_string(),
                }));
            }
        }

        if let Some(warning) = &outcome.persistence_warning {
            self.emit(CoreEvent::Manifest(ManifestEvent::PersistenceFailed {
                message: warning.to_string(),
            }));
        }

        (report, outcome.persistence_warning)
    }

    /// Returns `true` when a file was removed.
    async fn delete_file(&self, path: &str, report: &mut DeletionReport) -> bool {
        match self.fs.delete_file_if_exists(Path::new(path)).await {
            Ok(true) => {
                report.files_deleted += 1;
                true
            }
            Ok(false) => {
                report.files_missing += 1;
                false
            }
            Err(e) => {
                warn!(file = %strip_path(path), error = %e, "Failed to delete offline file");
                report.file_errors.push(format!("{}: {}", path, e));
                false
            }
        }
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(event);
        }
    }
}
