//! Integration tests for overlapping download and delete requests
//!
//! Downloads are paused at a chosen file with a [`Gate`] so the queue can be
//! observed mid-request:
//! - Queued and Downloading states with page progress
//! - Requests waiting for a concurrency permit
//! - Same-title requests sharing chapters
//! - Deletion cascades racing an in-flight commit

mod common;

use common::*;
use core_offline::{ChapterStatus, OfflineConfig, QueueStatus};

#[tokio::test]
async fn test_queue_tracks_progress_while_downloading() {
    let h = Harness::new().await;
    let cover_gate = h.gate("t1-cover.jpg");
    let p1_gate = h.gate("t1-c1-p1.jpg");
    let p2_gate = h.gate("t1-c1-p2.jpg");

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .download("t1", &ids(&["c1"]), &sources("t1", &[("c1", 3)]))
            .await
    });

    cover_gate.reached().await;
    let entry = h.queue.status("t1", "c1").unwrap();
    assert_eq!(entry.status, QueueStatus::Queued);
    assert_eq!(entry.progress, 0.0);
    cover_gate.release();

    p1_gate.reached().await;
    let entry = h.queue.status("t1", "c1").unwrap();
    assert_eq!(entry.status, QueueStatus::Downloading);
    assert_eq!((entry.completed_pages, entry.total_pages), (1, 3));
    assert!((entry.progress - 1.0 / 3.0).abs() < 1e-9);
    p1_gate.release();

    p2_gate.reached().await;
    let entry = h.queue.status("t1", "c1").unwrap();
    assert_eq!(entry.completed_pages, 2);
    assert!((entry.progress - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(h.manifest.page_paths("t1", "c1").await, None);
    p2_gate.release();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.committed, ids(&["c1"]));
    assert!(h.queue.status("t1", "c1").is_none());
    assert_eq!(h.manifest.status("t1", "c1").await, ChapterStatus::downloaded());
}

#[tokio::test]
async fn test_request_waiting_for_permit_is_queued() {
    let h = Harness::with_config(OfflineConfig::default().with_max_concurrent_requests(1)).await;
    let gate = h.gate("t1-c1-p0.jpg");

    let orchestrator = h.orchestrator.clone();
    let first = tokio::spawn(async move {
        orchestrator
            .download("t1", &ids(&["c1"]), &sources("t1", &[("c1", 1)]))
            .await
    });
    gate.reached().await;

    let orchestrator = h.orchestrator.clone();
    let second = tokio::spawn(async move {
        orchestrator
            .download("t2", &ids(&["c9"]), &sources("t2", &[("c9", 1)]))
            .await
    });

    let queue = h.queue.clone();
    assert!(
        eventually(|| {
            let queue = queue.clone();
            async move {
                matches!(
                    queue.status("t2", "c9"),
                    Some(entry) if entry.status == QueueStatus::Queued
                )
            }
        })
        .await
    );
    assert!(!h.http.requested().contains(&cover_url("t2")));

    gate.release();
    assert_eq!(first.await.unwrap().unwrap().committed, ids(&["c1"]));
    assert_eq!(second.await.unwrap().unwrap().committed, ids(&["c9"]));
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn test_same_title_requests_share_chapters() {
    let h = Harness::new().await;
    let gate = h.gate("t1-c1-p0.jpg");
    let src = sources("t1", &[("c1", 1), ("c2", 1), ("c3", 1)]);

    let orchestrator = h.orchestrator.clone();
    let first_src = src.clone();
    let first = tokio::spawn(async move {
        orchestrator
            .download("t1", &ids(&["c1", "c3"]), &first_src)
            .await
    });
    gate.reached().await;

    let second = h
        .orchestrator
        .download("t1", &ids(&["c2", "c3"]), &src)
        .await
        .unwrap();
    assert_eq!(second.in_flight, ids(&["c3"]));
    assert_eq!(second.committed, ids(&["c2"]));
    assert_eq!(
        h.queue.status("t1", "c3").map(|e| e.status),
        Some(QueueStatus::Queued)
    );

    gate.release();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.committed, ids(&["c1", "c3"]));

    let page_fetches = h
        .http
        .requested()
        .iter()
        .filter(|url| **url == page_url("t1", "c3", 0))
        .count();
    assert_eq!(page_fetches, 1);

    let restarted = h.restart().await;
    for chapter in ["c1", "c2", "c3"] {
        assert_eq!(
            restarted.manifest.status("t1", chapter).await,
            ChapterStatus::downloaded()
        );
    }
}

#[tokio::test]
async fn test_cover_restored_after_title_deleted_mid_download() {
    let h = Harness::new().await;
    let src = sources("t1", &[("c1", 1), ("c2", 2)]);
    h.orchestrator
        .download("t1", &ids(&["c1"]), &src)
        .await
        .unwrap();

    let gate = h.gate("t1-c2-p0.jpg");
    let orchestrator = h.orchestrator.clone();
    let task_src = src.clone();
    let task =
        tokio::spawn(async move { orchestrator.download("t1", &ids(&["c2"]), &task_src).await });
    gate.reached().await;

    let deleted = h.deletion.delete_chapter("t1", "c1").await.unwrap();
    assert!(deleted.title_removed);
    assert!(!h.fs.has(&cover_path("t1")));

    gate.release();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.committed, ids(&["c2"]));
    assert_eq!(h.manifest.cover_path("t1").await, Some(cover_path("t1")));
    assert!(h.fs.has(&cover_path("t1")));
    assert!(h.fs.has(&page_path("t1", "c2", 1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_requests_download_chapter_once() {
    for _ in 0..25 {
        let h = Harness::new().await;
        let src = sources("t1", &[("c1", 2)]);

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let orchestrator = h.orchestrator.clone();
                let src = src.clone();
                tokio::spawn(async move { orchestrator.download("t1", &ids(&["c1"]), &src).await })
            })
            .collect();

        let mut committed = 0;
        for task in tasks {
            let report = task.await.unwrap().unwrap();
            committed += report.committed.len();
            assert_eq!(
                report.committed.len() + report.already_downloaded.len() + report.in_flight.len(),
                1
            );
        }
        assert_eq!(committed, 1);

        let page_fetches = h
            .http
            .requested()
            .iter()
            .filter(|url| **url == page_url("t1", "c1", 0))
            .count();
        assert_eq!(page_fetches, 1);
    }
}
