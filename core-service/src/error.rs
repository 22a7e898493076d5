use core_offline::OfflineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(core_runtime::Error),

    #[error("Offline content error: {0}")]
    Offline(#[from] OfflineError),
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Runtime(other),
        }
    }
}

impl CoreError {
    /// `true` when the failure only affected durable storage; the request
    /// itself took effect.
    pub fn is_persistence_warning(&self) -> bool {
        matches!(self, CoreError::Offline(e) if e.is_persistence_warning())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
