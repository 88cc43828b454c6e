//! Error types and retry classification for the Survarium API client.
//!
//! This module provides:
//! - [`ApiError`]: The error enum for every client operation
//! - [`RetryClass`]: Classification used by the retry policy and the stack

use thiserror::Error;

/// Result type alias for Survarium API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Classification for retry policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad input or a body that is not JSON.
    Never,

    /// Retry with backoff, subject to the status rules of
    /// [`retry_allowed`](crate::retry::retry_allowed).
    WithBackoff,
}

/// Errors that can occur while building, sending or parsing a request.
#[derive(Clone, Debug, Error)]
pub enum ApiError {
    /// Caller input failed validation. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// Transport failure or non-2xx response.
    ///
    /// `status` is `None` for network errors and timeouts.
    #[error("{}", http_message(.status, .message))]
    Http {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// The response body was not valid JSON.
    #[error("{message} in \"{method} {host}{path}\"")]
    Parse {
        message: String,
        body: String,
        host: String,
        method: String,
        path: String,
    },

    /// The request stack task has stopped.
    #[error("request stack is closed")]
    StackClosed,

    /// A stacked request panicked while running.
    #[error("stacked request panicked: {0}")]
    TaskPanicked(String),

    /// No endpoint with the given name.
    #[error("no method {0} available")]
    UnknownMethod(String),
}

fn http_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Response code {} ({})", code, message),
        None => message.to_string(),
    }
}

impl ApiError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an HTTP error from an optional status and message
    pub fn http(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use survarium_api::{ApiError, RetryClass};
    ///
    /// let error = ApiError::http(Some(429), "Too Many Requests");
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = ApiError::validation("no pid received");
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Http { .. } => RetryClass::WithBackoff,
            Self::Validation(_)
            | Self::Parse { .. }
            | Self::StackClosed
            | Self::TaskPanicked(_)
            | Self::UnknownMethod(_) => RetryClass::Never,
        }
    }

    /// Status code a proxy should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Http {
                status: Some(code), ..
            } => *code,
            Self::Http { status: None, .. } => 503,
            Self::Parse { .. }
            | Self::StackClosed
            | Self::TaskPanicked(_)
            | Self::UnknownMethod(_) => 500,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Timeout: {}", err)
        } else {
            format!("Request failed: {}", err)
        };
        Self::Http {
            status: err.status().map(|s| s.as_u16()),
            message,
            body: None,
        }
    }
}
