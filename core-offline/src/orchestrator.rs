//! # Download Orchestrator
//!
//! Sequences one download request: enqueue, cover, then each chapter's pages
//! in order. A chapter is committed to the manifest only after all of its
//! pages are on disk; a failing page rolls the whole chapter back.
//!
//! ```text
//! NotRequested ──> Queued ──> Downloading ──> Committed
//!                                  │
//!                                  └── page failure: delete written pages,
//!                                      clear queue entry ──> NotRequested
//! ```

use bridge_traits::{AssetRef, ChapterSourceSet, FileSystemAccess};
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, ManifestEvent};
use core_runtime::logging::strip_path;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::{FailurePolicy, OfflineConfig};
use crate::error::{OfflineError, Result};
use crate::manifest::ManifestStore;
use crate::models::{ChapterFailure, ChapterState, DownloadReport, SkippedChapter};
use crate::paths::ContentLayout;
use crate::queue::DownloadQueue;
use crate::resolver::AssetResolver;

/// Drives chapter downloads from catalog sources into the manifest.
pub struct DownloadOrchestrator {
    manifest: Arc<ManifestStore>,
    queue: Arc<DownloadQueue>,
    resolver: Arc<dyn AssetResolver>,
    fs: Arc<dyn FileSystemAccess>,
    layout: ContentLayout,
    failure_policy: FailurePolicy,
    request_permits: Semaphore,
    event_bus: Option<Arc<EventBus>>,
}

impl DownloadOrchestrator {
    pub fn new(
        manifest: Arc<ManifestStore>,
        queue: Arc<DownloadQueue>,
        resolver: Arc<dyn AssetResolver>,
        fs: Arc<dyn FileSystemAccess>,
        layout: ContentLayout,
        config: &OfflineConfig,
    ) -> Self {
        Self {
            manifest,
            queue,
            resolver,
            fs,
            layout,
            failure_policy: config.failure_policy,
            request_permits: Semaphore::new(config.max_concurrent_requests.max(1)),
            event_bus: None,
        }
    }

    /// Attach an event bus for download progress notifications.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Download the requested chapters of a title.
    ///
    /// Chapters already downloaded or in flight for another request are
    /// reported and left alone. Under [`FailurePolicy::AbortBatch`] the first
    /// failed chapter ends the request with [`OfflineError::BatchAborted`].
    ///
    /// # Errors
    ///
    /// Returns [`OfflineError::MaterializeFailed`] when the cover cannot be
    /// downloaded; no chapter is attempted in that case.
    #[instrument(skip(self, chapter_ids, sources), fields(requested = chapter_ids.len()))]
    pub async fn download(
        &self,
        title_id: &str,
        chapter_ids: &[String],
        sources: &ChapterSourceSet,
    ) -> Result<DownloadReport> {
        let mut report = DownloadReport::new(title_id);
        let downloaded = self.manifest.downloaded_chapters(title_id).await;
        let outcome = self.queue.enqueue(title_id, chapter_ids, &downloaded);

        report.already_downloaded = outcome.already_downloaded;
        report.in_flight = outcome.in_flight;

        let mut work: Vec<(String, &[AssetRef])> = Vec::with_capacity(outcome.queued.len());
        for chapter_id in outcome.queued {
            // Committed by a concurrent request between the snapshot and enqueue.
            let status = self.manifest.status(title_id, &chapter_id).await;
            if status.state == ChapterState::Downloaded {
                self.queue.clear(title_id, &chapter_id);
                report.already_downloaded.push(chapter_id);
                continue;
            }

            self.emit(DownloadEvent::ChapterQueued {
                title_id: title_id.to_string(),
                chapter_id: chapter_id.clone(),
            });

            match sources.pages_for(&chapter_id) {
                Some(pages) if !pages.is_empty() => work.push((chapter_id, pages)),
                _ => {
                    let reason = OfflineError::SourceMissing {
                        title_id: title_id.to_string(),
                        chapter_id: chapter_id.clone(),
                    };
                    warn!(chapter_id = %chapter_id, "{}", reason);
                    self.queue.clear(title_id, &chapter_id);
                    self.emit(DownloadEvent::ChapterSkipped {
                        title_id: title_id.to_string(),
                        chapter_id: chapter_id.clone(),
                    });
                    report.skipped.push(SkippedChapter {
                        chapter_id,
                        reason: reason.to_string(),
                    });
                }
            }
        }

        if work.is_empty() {
            debug!("Nothing to download");
            return Ok(report);
        }

        // Entries stay Queued while earlier requests hold every permit.
        let _permit = match self.request_permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                for (chapter_id, _) in &work {
                    self.queue.clear(title_id, chapter_id);
                }
                return Err(OfflineError::Internal(format!(
                    "Request limiter closed: {}",
                    e
                )));
            }
        };

        let (cover_path, cover_created) = match self.manifest.cover_path(title_id).await {
            Some(path) => (path, false),
            None => {
                let target = self.layout.cover_path(title_id, &sources.cover);
                if let Err(e) = self.resolver.materialize(&sources.cover, &target).await {
                    warn!(error = %e, "Cover download failed, dropping request");
                    for (chapter_id, _) in &work {
                        self.queue.clear(title_id, chapter_id);
                        self.emit(DownloadEvent::ChapterFailed {
                            title_id: title_id.to_string(),
                            chapter_id: chapter_id.clone(),
                            page_index: None,
                            message: e.to_string(),
                        });
                    }
                    return Err(e);
                }
                (target.to_string_lossy().into_owned(), true)
            }
        };

        let mut remaining = work.into_iter();
        while let Some((chapter_id, pages)) = remaining.next() {
            match self
                .download_chapter(title_id, &chapter_id, pages, &sources.cover, &cover_path)
                .await
            {
                Ok(persistence_warning) => {
                    if let Some(warning) = persistence_warning {
                        self.emit_manifest(ManifestEvent::PersistenceFailed {
                            message: warning.to_string(),
                        });
                        report.persistence_warnings.push(warning.to_string());
                    }
                    report.committed.push(chapter_id);
                }
                Err(failure) => {
                    let reason = failure.reason.clone();
                    report.failed.push(failure);

                    if self.failure_policy == FailurePolicy::AbortBatch {
                        for (rest, _) in remaining {
                            self.queue.clear(title_id, &rest);
                            report.aborted.push(rest);
                        }
                        self.remove_orphan_cover(title_id, &cover_path, cover_created, &report)
                            .await;

                        warn!(
                            chapter_id = %chapter_id,
                            aborted = report.aborted.len(),
                            "Download request aborted"
                        );
                        return Err(OfflineError::BatchAborted {
                            title_id: title_id.to_string(),
                            chapter_id,
                            reason,
                            report: Box::new(report),
                        });
                    }
                }
            }
        }

        self.remove_orphan_cover(title_id, &cover_path, cover_created, &report)
            .await;

        info!(
            committed = report.committed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Download request finished"
        );
        Ok(report)
    }

    /// Download every page of one chapter and commit it.
    ///
    /// Returns the manifest persistence warning, if any.
    async fn download_chapter(
        &self,
        title_id: &str,
        chapter_id: &str,
        pages: &[AssetRef],
        cover: &AssetRef,
        cover_path: &str,
    ) -> std::result::Result<Option<OfflineError>, ChapterFailure> {
        let total = pages.len();
        self.queue.set_downloading(title_id, chapter_id, total);

        let mut written = Vec::with_capacity(total);
        for (index, asset) in pages.iter().enumerate() {
            let target = self.layout.page_path(title_id, chapter_id, index, asset);

            if let Err(e) = self.resolver.materialize(asset, &target).await {
                written.push(target.to_string_lossy().into_owned());
                return Err(self
                    .roll_back(title_id, chapter_id, &written, Some(index), e.to_string())
                    .await);
            }

            written.push(target.to_string_lossy().into_owned());
            let completed = index + 1;
            self.queue
                .set_progress(title_id, chapter_id, completed as f64 / total as f64);
            self.emit(DownloadEvent::ChapterProgress {
                title_id: title_id.to_string(),
                chapter_id: chapter_id.to_string(),
                completed_pages: completed,
                total_pages: total,
                percent: ((completed * 100) / total) as u8,
            });
        }

        // A deletion cascade may have removed the cover while pages downloaded.
        if let Err(e) = self.ensure_cover(cover, cover_path).await {
            return Err(self
                .roll_back(title_id, chapter_id, &written, None, e.to_string())
                .await);
        }

        let outcome = match self
            .manifest
            .commit_chapter(title_id, chapter_id, written.clone(), cover_path)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                return Err(self
                    .roll_back(title_id, chapter_id, &written, None, e.to_string())
                    .await)
            }
        };
        self.queue.clear(title_id, chapter_id);

        debug!(chapter_id, pages = total, "Chapter committed");
        self.emit(DownloadEvent::ChapterCommitted {
            title_id: title_id.to_string(),
            chapter_id: chapter_id.to_string(),
            page_count: total,
        });
        Ok(outcome.persistence_warning)
    }

    async fn ensure_cover(&self, cover: &AssetRef, cover_path: &str) -> Result<()> {
        let path = Path::new(cover_path);
        if self.fs.exists(path).await.unwrap_or(false) {
            return Ok(());
        }

        debug!(file = %strip_path(cover_path), "Cover missing before commit, restoring");
        self.resolver.materialize(cover, path).await
    }

    async fn roll_back(
        &self,
        title_id: &str,
        chapter_id: &str,
        written: &[String],
        page_index: Option<usize>,
        reason: String,
    ) -> ChapterFailure {
        warn!(chapter_id, page_index = ?page_index, reason = %reason, "Chapter failed, rolling back");

        for path in written {
            if let Err(e) = self.fs.delete_file_if_exists(Path::new(path)).await {
                warn!(file = %strip_path(path), error = %e, "Failed to delete partial page");
            }
        }
        self.queue.clear(title_id, chapter_id);

        self.emit(DownloadEvent::ChapterFailed {
            title_id: title_id.to_string(),
            chapter_id: chapter_id.to_string(),
            page_index,
            message: reason.clone(),
        });

        ChapterFailure {
            chapter_id: chapter_id.to_string(),
            page_index,
            reason,
        }
    }

    /// Delete a cover written by this request when nothing ended up using it.
    async fn remove_orphan_cover(
        &self,
        title_id: &str,
        cover_path: &str,
        created_here: bool,
        report: &DownloadReport,
    ) {
        if !created_here || !report.committed.is_empty() {
            return;
        }
        if self.manifest.cover_path(title_id).await.is_some() {
            return;
        }
        if !self.queue.entries_for_title(title_id).is_empty() {
            return;
        }

        match self.fs.delete_file_if_exists(Path::new(cover_path)).await {
            Ok(_) => debug!(file = %strip_path(cover_path), "Removed unused cover"),
            Err(e) => warn!(file = %strip_path(cover_path), error = %e, "Failed to remove unused cover"),
        }
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Download(event));
        }
    }

    fn emit_manifest(&self, event: ManifestEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Manifest(event));
        }
    }
}
