//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the reader core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast bridge checks
//! - Event bus for download and manifest notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
