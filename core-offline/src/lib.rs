//! # Offline Content Cache
//!
//! Downloads a title's chapters (ordered page images) to local storage so
//! they can be read without network access, tracks per-chapter progress,
//! and removes downloaded content on request.
//!
//! ## Components
//!
//! - [`ManifestStore`](manifest::ManifestStore) - Durable record of downloaded
//!   chapters and covers, persisted as one JSON document in the `SettingsStore`
//! - [`DownloadQueue`](queue::DownloadQueue) - Transient per-chapter status and progress
//! - [`AssetResolver`](resolver::AssetResolver) - Materializes remote or bundled
//!   assets at a local path
//! - [`DownloadOrchestrator`](orchestrator::DownloadOrchestrator) - Sequences
//!   cover, chapters and pages; commits or rolls back each chapter
//! - [`DeletionManager`](deletion::DeletionManager) - Removes chapters and
//!   cascades to the cover once a title has none left
//!
//! ## Chapter lifecycle
//!
//! ```text
//! NotRequested ──enqueue──> Queued ──first page──> Downloading ──all pages──> Committed
//!       ^                                               │
//!       └──────────────── page failure (rollback) ──────┘
//! ```
//!
//! A chapter is never reported as downloaded with a partial page list: page
//! paths reach the manifest only after every page of the chapter is on disk.

pub mod config;
pub mod deletion;
pub mod error;
pub mod manifest;
pub mod models;
pub mod orchestrator;
pub mod paths;
pub mod queue;
pub mod resolver;

pub use config::{FailurePolicy, OfflineConfig};
pub use deletion::DeletionManager;
pub use error::{OfflineError, Result};
pub use manifest::ManifestStore;
pub use models::{
    ChapterFailure, ChapterState, ChapterStatus, DeletionReport, DownloadReport, DownloadSummary,
    ManifestEntry, MutationOutcome, QueueEntry, QueueStatus, RemovedChapter, SkippedChapter,
};
pub use orchestrator::DownloadOrchestrator;
pub use paths::ContentLayout;
pub use queue::{DownloadQueue, EnqueueOutcome};
pub use resolver::{AssetResolver, BridgeAssetResolver};
