//! # Event Bus System
//!
//! Event-driven notifications for the reader core using `tokio::sync::broadcast`.
//! The offline cache publishes download progress and deletion events here so
//! UI layers can react without polling `chapter_status`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   emit    ┌───────────┐
//! │ Orchestrator ├──────────>│           │   subscribe   ┌────────────┐
//! └──────────────┘           │ EventBus  ├──────────────>│ Subscriber │
//! ┌──────────────┐   emit    │ (broadcast│               └────────────┘
//! │ Deletion Mgr ├──────────>│  channel) │
//! └──────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Download(DownloadEvent::ChapterQueued {
//!         title_id: "t1".to_string(),
//!         chapter_id: "c1".to_string(),
//!     }))
//!     .ok();
//!
//! let received = subscriber.recv().await.unwrap();
//! assert_eq!(received.description(), "Chapter queued for download");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   progress events are superseded by later ones anyway.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Chapter download and deletion events
    Download(DownloadEvent),
    /// Offline manifest lifecycle events
    Manifest(ManifestEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Download(e) => e.description(),
            CoreEvent::Manifest(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Download(DownloadEvent::ChapterFailed { .. }) => EventSeverity::Error,
            CoreEvent::Manifest(ManifestEvent::PersistenceFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::ChapterSkipped { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::ChapterCommitted { .. }) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::TitleRemoved { .. }) => EventSeverity::Info,
            CoreEvent::Manifest(ManifestEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Title the event concerns, if any.
    pub fn title_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Download(e) => Some(e.title_id()),
            CoreEvent::Manifest(_) => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Download Events
// ============================================================================

/// Per-chapter download lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    /// Chapter accepted into the download queue.
    ChapterQueued { title_id: String, chapter_id: String },
    /// A page finished materializing.
    ChapterProgress {
        title_id: String,
        chapter_id: String,
        completed_pages: usize,
        total_pages: usize,
        /// Progress percentage (0-100).
        percent: u8,
    },
    /// Every page is on disk and the chapter is recorded in the manifest.
    ChapterCommitted {
        title_id: String,
        chapter_id: String,
        page_count: usize,
    },
    /// The catalog had no pages for the chapter.
    ChapterSkipped { title_id: String, chapter_id: String },
    /// The chapter was rolled back.
    ChapterFailed {
        title_id: String,
        chapter_id: String,
        /// Index of the page that failed, `None` when the cover failed.
        page_index: Option<usize>,
        message: String,
    },
    /// A downloaded chapter was removed from disk and manifest.
    ChapterDeleted { title_id: String, chapter_id: String },
    /// The last chapter of a title was removed together with its cover.
    TitleRemoved { title_id: String },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::ChapterQueued { .. } => "Chapter queued for download",
            DownloadEvent::ChapterProgress { .. } => "Chapter download in progress",
            DownloadEvent::ChapterCommitted { .. } => "Chapter downloaded",
            DownloadEvent::ChapterSkipped { .. } => "Chapter has no pages to download",
            DownloadEvent::ChapterFailed { .. } => "Chapter download failed",
            DownloadEvent::ChapterDeleted { .. } => "Downloaded chapter deleted",
            DownloadEvent::TitleRemoved { .. } => "Title removed from offline storage",
        }
    }

    pub fn title_id(&self) -> &str {
        match self {
            DownloadEvent::ChapterQueued { title_id, .. }
            | DownloadEvent::ChapterProgress { title_id, .. }
            | DownloadEvent::ChapterCommitted { title_id, .. }
            | DownloadEvent::ChapterSkipped { title_id, .. }
            | DownloadEvent::ChapterFailed { title_id, .. }
            | DownloadEvent::ChapterDeleted { title_id, .. }
            | DownloadEvent::TitleRemoved { title_id } => title_id,
        }
    }
}

// ============================================================================
// Manifest Events
// ============================================================================

/// Events about the persisted offline manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ManifestEvent {
    /// Manifest loaded at startup.
    Loaded {
        title_count: usize,
        /// Entries discarded because they were malformed.
        dropped_entries: usize,
    },
    /// A flush to the key-value store failed; memory stays authoritative.
    PersistenceFailed { message: String },
}

impl ManifestEvent {
    fn description(&self) -> &str {
        match self {
            ManifestEvent::Loaded { .. } => "Offline manifest loaded",
            ManifestEvent::PersistenceFailed { .. } => "Offline manifest could not be saved",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with [`DEFAULT_EVENT_BUFFER_SIZE`].
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let title_stream = EventStream::new(event_bus.subscribe()).for_title("t1");
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only yield events about one title.
    pub fn for_title(self, title_id: impl Into<String>) -> Self {
        let title_id = title_id.into();
        self.filter(move |event| event.title_id() == Some(title_id.as_str()))
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
