/*!
 * Error types for the notewai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Provider failures are classified into an [`ErrorKind`] so the retry controller
 * can decide whether another attempt makes sense without inspecting messages.
 */

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed translation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Invalid or missing credentials
    AuthError,
    /// The provider asked us to slow down
    RateLimited,
    /// Timeouts, connection resets, 5xx responses
    TransientNetworkError,
    /// The provider answered but the payload could not be understood
    MalformedResponse,
    /// The configured model does not exist for this provider
    UnsupportedModel,
    /// The batch was cancelled before this work finished
    Cancelled,
    /// Anything the provider client could not classify
    Unknown,
}

impl ErrorKind {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientNetworkError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuthError => "AuthError",
            Self::RateLimited => "RateLimited",
            Self::TransientNetworkError => "TransientNetworkError",
            Self::MalformedResponse => "MalformedResponse",
            Self::UnsupportedModel => "UnsupportedModel",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    /// Classification used by the retry controller
    pub kind: ErrorKind,

    /// Human-readable detail, usually the provider's own error text
    pub message: String,

    /// Minimum wait requested by the provider (e.g. a `Retry-After` header)
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Authentication error (invalid API key)
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthError, message)
    }

    /// Rate limit error with an optional wait hint
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(ErrorKind::RateLimited, message)
        }
    }

    /// Connection, timeout or server-side error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientNetworkError, message)
    }

    /// Response body did not have the expected shape
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    /// Model rejected by the provider
    pub fn unsupported_model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedModel, message)
    }

    /// Work abandoned because the batch was cancelled
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "translation cancelled")
    }

    /// Whether the retry controller may try again
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Errors that abort a whole batch before any request is sent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// The translation configuration cannot be used
    #[error("Invalid translation configuration: {0}")]
    ConfigInvalid(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the batch orchestrator
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
