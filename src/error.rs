//! Error types for DevStudio

use thiserror::Error;

/// Result type alias using DevStudio's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for DevStudio
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation requires a booted sandbox
    #[error("Sandbox not ready: {0}")]
    NotReady(String),

    /// Sandbox backend failure
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Backend does not provide an optional primitive
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A subprocess exited with a non-zero code
    #[error("`{command}` exited with code {code}")]
    ProcessExit {
        /// Command line that was run
        command: String,
        /// Exit code reported by the sandbox
        code: i32,
    },

    /// Remote repository host error
    #[error("Remote host error: {0}")]
    Remote(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Operation abandoned because the caller stopped it
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Remote(_) | Error::Timeout(_))
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::NotFound(_) | Error::Unauthorized(_)
        )
    }

    /// Check if the error reports a missing path
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
