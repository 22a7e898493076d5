use thiserror::Error;

/// Errors raised while assembling and configuring the reader core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not supplied and no default exists.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn capability_missing(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CapabilityMissing {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Name of the missing bridge, if this is a capability error.
    pub fn missing_capability(&self) -> Option<&str> {
        match self {
            Error::CapabilityMissing { capability, .. } => Some(capability),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
