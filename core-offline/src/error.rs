//! # Offline Cache Error Types

use bridge_traits::BridgeError;
use thiserror::Error;

use crate::models::DownloadReport;

/// Errors produced by the offline content cache.
#[derive(Error, Debug)]
pub enum OfflineError {
    /// The catalog returned no pages for a requested chapter.
    #[error("No page sources for chapter {chapter_id} of title {title_id}")]
    SourceMissing { title_id: String, chapter_id: String },

    /// An asset could not be fetched or written to its target path.
    #[error("Failed to materialize {asset} to {target}: {reason}")]
    MaterializeFailed {
        asset: String,
        target: String,
        reason: String,
    },

    /// The manifest could not be written to the settings store.
    ///
    /// The in-memory manifest already reflects the mutation.
    #[error("Failed to persist offline manifest: {0}")]
    PersistenceFailed(String),

    /// A chapter failed under the abort-batch policy; later chapters were
    /// not attempted.
    #[error("Download of title {title_id} aborted at chapter {chapter_id}: {reason}")]
    BatchAborted {
        title_id: String,
        chapter_id: String,
        reason: String,
        report: Box<DownloadReport>,
    },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    #[error("Invalid offline configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OfflineError {
    /// `true` when the operation's effect was applied in memory and only
    /// the durable copy lags behind.
    pub fn is_persistence_warning(&self) -> bool {
        matches!(self, OfflineError::PersistenceFailed(_))
    }

    /// `true` when re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OfflineError::MaterializeFailed { .. }
                | OfflineError::PersistenceFailed(_)
                | OfflineError::BatchAborted { .. }
                | OfflineError::Catalog(_)
                | OfflineError::Storage(_)
        )
    }

    /// Partial report carried by a batch abort.
    pub fn report(&self) -> Option<&DownloadReport> {
        match self {
            OfflineError::BatchAborted { report, .. } => Some(report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OfflineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let persistence = OfflineError::PersistenceFailed("disk full".to_string());
        assert!(persistence.is_persistence_warning());
        assert!(persistence.is_retryable());

        let missing = OfflineError::SourceMissing {
            title_id: "t1".to_string(),
            chapter_id: "c1".to_string(),
        };
        assert!(!missing.is_retryable());
        assert!(!missing.is_persistence_warning());
        assert!(!OfflineError::Config("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_batch_aborted_exposes_report() {
        let mut report = DownloadReport::new("t1");
        report.aborted.push("c3".to_string());

        let err = OfflineError::BatchAborted {
            title_id: "t1".to_string(),
            chapter_id: "c2".to_string(),
            reason: "HTTP 500".to_string(),
            report: Box::new(report),
        };

        assert_eq!(err.report().map(|r| r.aborted.len()), Some(1));
        assert!(err.to_string().contains("aborted at chapter c2"));
    }

    #[test]
    fn test_bridge_error_conversion() {
        let err: OfflineError = BridgeError::NotFound("x".to_string()).into();
        assert!(matches!(err, OfflineError::Storage(_)));
    }
}
