//! Common error types for Watchlog

use thiserror::Error;

/// Common result type for Watchlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the library and the server
#[derive(Error, Debug)]
pub enum Error {
    /// Local store error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Irreversible operation attempted without explicit confirmation
    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    /// Remote service answered with a non-success status
    #[error("Remote error {status}: {message}")]
    Remote { status: u16, message: String },

    /// Feature disabled because its credentials are not configured
    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures of a remote backend or external API
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. } | Error::Http(_))
    }
}
