//! Error types for OTA backend operations

use ota_core::SubmitError;
use thiserror::Error;

/// Result type alias for OTA client operations
pub type Result<T> = std::result::Result<T, OtaClientError>;

/// Errors that can occur while talking to the OTA backend
#[derive(Error, Debug)]
pub enum OtaClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error (reading a firmware file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend returned an error response
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,

    /// Client configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Draft submission failed before reaching the catalog endpoint
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl OtaClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Map a transport failure, keeping timeouts distinguishable
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// HTTP status carried by the error, if the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
