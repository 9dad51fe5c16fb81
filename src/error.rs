// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the internal API client
//!
//! Construction errors (bad URL, method or header) are returned while a
//! request is being built. Transport errors (dial, TLS, cancellation) only
//! appear when the request is dispatched. Non-success answers from the
//! internal API become [`Error::Internal`] at the manager layer.

use thiserror::Error;

/// Result type alias for internal API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the internal API client
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP protocol failure on an established connection
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Request target could not be turned into a request URI
    #[error("Invalid request URI: {0}")]
    Uri(#[from] http::uri::InvalidUri),

    /// Method string is not a valid HTTP method
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// Header name or value is not representable on the wire
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// TLS setup or handshake failed
    #[error("TLS error for {server_name}: {reason}")]
    Tls { server_name: String, reason: String },

    /// The call context was cancelled
    #[error("context canceled")]
    Cancelled,

    /// The call context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Per-request timeout elapsed
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        url: Option<String>,
    },

    /// The internal API answered with a non-success status
    #[error("internal API returned {status}: {message}")]
    Internal { status: u16, message: String },

    /// I/O error (dial, socket, file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid header error
    pub fn invalid_header(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidHeader {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a TLS error
    pub fn tls(server_name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Tls {
            server_name: server_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: None,
        }
    }

    /// Create a timeout error with URL
    pub fn timeout_with_url(
        operation: impl Into<String>,
        duration_ms: u64,
        url: impl Into<String>,
    ) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: Some(url.into()),
        }
    }

    /// Create an error from a non-success internal API answer
    pub fn internal(status: u16, message: impl Into<String>) -> Self {
        Error::Internal {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::DeadlineExceeded)
    }

    /// Check if the call context ended the operation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// Check if this happened while talking to the server rather than while
    /// building the request
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Io(_) | Error::Tls { .. } | Error::Timeout { .. }
        )
    }

    /// Check if the caller may reasonably try again
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Http(_) | Error::Io(_) => true,
            Error::Internal { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Get HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Internal { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Timeout { url: Some(u), .. } => Some(u),
            _ => None,
        }
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add URL context to error
    fn with_url(self, url: &str) -> Result<T>;

    /// Add operation context to error
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ErrorContext<T> for std::result::Result<T, E> {
    fn with_url(self, url: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            match err {
                Error::Timeout {
                    operation,
                    duration_ms,
                    ..
                } => Error::Timeout {
                    operation,
                    duration_ms,
                    url: Some(url.to_string()),
                },
                other => other,
            }
        })
    }

    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            Error::Other(format!("{}: {}", msg, err))
        })
    }
}
