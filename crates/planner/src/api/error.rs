//! Error types for talking to the course-data API.

use thiserror::Error;

/// Errors that can occur while fetching course data.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// The body was not JSON, or not the shape we expected
    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    /// Server answered with a non-success status
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// Year/term pair rejected before any request was made
    #[error("Invalid term: {year} {term}")]
    InvalidTerm { year: i32, term: u32 },
}

impl FetchError {
    /// Returns true if this error is potentially transient.
    ///
    /// Nothing in this crate retries automatically; callers may offer a manual retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn malformed(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::MalformedResponse {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return FetchError::MalformedResponse {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                message: err.to_string(),
            };
        }
        FetchError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::UrlError {
            message: err.to_string(),
        }
    }
}
