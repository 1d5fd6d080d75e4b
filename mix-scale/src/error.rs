//! Error types for the scale drivers

use thiserror::Error;

/// Scale driver error types
#[derive(Debug, Error)]
pub enum ScaleError {
    /// Device library missing or failed to initialise
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// No attached device matched
    #[error("No compatible scale found")]
    NoDevice,

    /// Port or device could not be opened
    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },

    /// IO error while talking to the device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device reported an error
    #[error("Device error: {0}")]
    Device(String),

    /// Invalid driver configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for scale operations
pub type ScaleResult<T> = Result<T, ScaleError>;
