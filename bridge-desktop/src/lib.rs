//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `AssetLoader` reading bundled assets from an on-disk asset directory
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let settings = SqliteSettingsStore::new(fs.get_data_directory().await?.join("settings.db")).await?;
//!
//!     // Hand these to CoreConfig::builder()
//!     Ok(())
//! }
//! ```

mod asset_loader;
mod filesystem;
mod http;
mod settings;

pub use asset_loader::DirectoryAssetLoader;
pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
