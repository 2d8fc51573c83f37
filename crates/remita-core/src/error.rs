use thiserror::Error;

/// Top-level error type for the Remita system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for RemitaError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemitaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Money error: {0}")]
    Money(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream state error: {0}")]
    UpstreamState(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for RemitaError {
    fn from(err: toml::de::Error) -> Self {
        RemitaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RemitaError {
    fn from(err: toml::ser::Error) -> Self {
        RemitaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RemitaError {
    fn from(err: serde_json::Error) -> Self {
        RemitaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Remita operations.
pub type Result<T> = std::result::Result<T, RemitaError>;
