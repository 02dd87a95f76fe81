//! Common error types for the ephys atlas tools

use thiserror::Error;

/// Common result type for ephys operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the ephys crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decoding error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token is not a canonical session identifier
    #[error("{0} not a valid insertion UUID")]
    InvalidIdentifier(String),
}
