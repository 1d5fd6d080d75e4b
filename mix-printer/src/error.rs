//! Error types for the virtual printer

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Listener could not bind
    #[error("Bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while reading or sending
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for the remote side
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
