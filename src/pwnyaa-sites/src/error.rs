//! Error types for site fetching.

use thiserror::Error;

/// Errors raised while talking to a CTF site.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Connection or protocol failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Unexpected HTTP status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Login did not produce a session.
    #[error("Login failed: {0}")]
    Login(String),

    /// Client construction or other local failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiteError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SiteError::Network(_) | SiteError::Timeout(_) => true,
            SiteError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            SiteError::Login(_) | SiteError::Internal(_) => false,
        }
    }
}

impl From<reqwest::Error> for SiteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SiteError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            SiteError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            SiteError::Network(err.to_string())
        }
    }
}

/// Result type for site operations.
pub type SiteResult<T> = std::result::Result<T, SiteError>;
