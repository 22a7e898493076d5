//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the offline reading core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests for remote images
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O inside the app data directory
//! - [`SettingsStore`](storage::SettingsStore) - Key-value persistence (holds the offline manifest)
//!
//! ### Content
//! - [`ContentCatalog`](catalog::ContentCatalog) - Cover and page sources for a title
//! - [`AssetLoader`](assets::AssetLoader) - Resolves bundled assets to local URIs
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it, keep messages actionable, and
//! report missing files through [`BridgeError::NotFound`] (or an `io::Error`
//! of kind `NotFound`) so callers can treat deletes idempotently.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so one adapter instance can be
//! shared across concurrent download tasks.

pub mod assets;
pub mod catalog;
pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use assets::{AssetLoader, AssetRef, ChapterSourceSet};
pub use catalog::ContentCatalog;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{FileMetadata, FileSystemAccess, SettingsStore};
