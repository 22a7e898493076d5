//! Workspace umbrella crate.
//!
//! Re-exports the offline content service so host applications can depend
//! on `reader-core-workspace` and pick a feature instead of wiring each
//! workspace crate individually:
//!
//! - `desktop-shims` (default): desktop bridges fill in any host bridge
//!   that is not supplied
//! - `headless`: the service only, every bridge comes from the host

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service::*;
