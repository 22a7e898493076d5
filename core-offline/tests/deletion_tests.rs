//! Integration tests for chapter and title deletion

mod common;

use common::*;
use core_offline::{ChapterState, OfflineError};
use core_runtime::events::{CoreEvent, DownloadEvent};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

async fn downloaded_harness(chapters: &[(&str, usize)]) -> Harness {
    let h = Harness::new().await;
    let requested: Vec<String> = chapters.iter().map(|(c, _)| c.to_string()).collect();
    h.orchestrator
        .download("t1", &requested, &sources("t1", chapters))
        .await
        .unwrap();
    h
}

#[tokio::test]
async fn test_delete_round_trip_removes_files() {
    let h = downloaded_harness(&[("c1", 3)]).await;
    assert_eq!(h.fs.count(), 4);

    let report = h.deletion.delete_chapter("t1", "c1").await.unwrap();

    assert_eq!(report.removed_chapters, ids(&["c1"]));
    assert_eq!(report.files_deleted, 4);
    assert!(report.cover_deleted);
    assert!(report.title_removed);
    assert_eq!(h.manifest.status("t1", "c1").await.state, ChapterState::None);
    assert_eq!(h.fs.count(), 0);
}

#[tokio::test]
async fn test_last_chapter_cascades_to_cover() {
    let h = downloaded_harness(&[("c1", 1), ("c2", 1)]).await;

    let first = h.deletion.delete_chapter("t1", "c1").await.unwrap();
    assert!(!first.title_removed);
    assert_eq!(h.manifest.cover_path("t1").await, Some(cover_path("t1")));
    assert!(h.fs.has(&cover_path("t1")));

    let last = h.deletion.delete_chapter("t1", "c2").await.unwrap();
    assert!(last.title_removed);
    assert!(h.manifest.cover_path("t1").await.is_none());
    assert!(!h.fs.has(&cover_path("t1")));
}

#[tokio::test]
async fn test_delete_missing_chapter_is_noop() {
    let h = downloaded_harness(&[("c1", 1)]).await;

    let report = h.deletion.delete_chapter("t1", "c9").await.unwrap();
    assert!(report.removed_chapters.is_empty());

    let report = h.deletion.delete_chapter("unknown", "c1").await.unwrap();
    assert!(report.removed_chapters.is_empty());
    assert_eq!(h.fs.count(), 2);
}

#[tokio::test]
async fn test_already_missing_files_are_tolerated() {
    let h = downloaded_harness(&[("c1", 2)]).await;
    h.fs.files
        .lock()
        .remove(&PathBuf::from(page_path("t1", "c1", 0)));

    let report = h.deletion.delete_chapter("t1", "c1").await.unwrap();

    assert_eq!(report.files_missing, 1);
    assert_eq!(report.files_deleted, 2);
    assert!(h.manifest.page_paths("t1", "c1").await.is_none());
}

#[tokio::test]
async fn test_file_errors_do_not_block_manifest_update() {
    let h = downloaded_harness(&[("c1", 2)]).await;
    h.fs.undeletable
        .lock()
        .insert(PathBuf::from(page_path("t1", "c1", 1)));

    let report = h.deletion.delete_chapter("t1", "c1").await.unwrap();

    assert_eq!(report.file_errors.len(), 1);
    assert!(h.manifest.page_paths("t1", "c1").await.is_none());
}

#[tokio::test]
async fn test_persistence_failure_reported_after_update() {
    let h = downloaded_harness(&[("c1", 1)]).await;
    h.settings.fail_writes.store(true, Ordering::SeqCst);

    let err = h.deletion.delete_chapter("t1", "c1").await.unwrap_err();

    assert!(matches!(err, OfflineError::PersistenceFailed(_)));
    assert!(h.manifest.page_paths("t1", "c1").await.is_none());
    assert_eq!(h.fs.count(), 0);
}

#[tokio::test]
async fn test_delete_title_removes_everything() {
    let h = downloaded_harness(&[("c1", 2), ("c2", 1), ("c3", 1)]).await;
    let mut events = h.event_bus.subscribe();

    let report = h.deletion.delete_title("t1").await.unwrap();

    assert_eq!(report.removed_chapters, ids(&["c1", "c2", "c3"]));
    assert!(report.title_removed);
    assert!(report.cover_deleted);
    assert!(h.manifest.titles().await.is_empty());
    assert_eq!(h.fs.count(), 0);

    let mut deleted = 0;
    let mut title_removed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Download(DownloadEvent::ChapterDeleted { .. }) => deleted += 1,
            CoreEvent::Download(DownloadEvent::TitleRemoved { .. }) => title_removed += 1,
            _ => {}
        }
    }
    assert_eq!(deleted, 3);
    assert_eq!(title_removed, 1);
}

#[tokio::test]
async fn test_download_after_delete_starts_fresh() {
    let h = downloaded_harness(&[("c1", 1)]).await;
    h.deletion.delete_chapter("t1", "c1").await.unwrap();

    let report = h
        .orchestrator
        .download("t1", &ids(&["c1"]), &sources("t1", &[("c1", 1)]))
        .await
        .unwrap();

    assert_eq!(report.committed, ids(&["c1"]));
    assert!(h.fs.has(&cover_path("t1")));
}
