//! API-specific error types
//!
//! Every failure surfaced by [`super::ApiClient`] and [`super::OfleetService`]
//! is an [`ApiError`].

use std::time::Duration;

use ofleet_common::auth::TokenManagerError;
use ofleet_domain::OfleetError;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Token acquisition or refresh failed
    Authentication,
    /// The server answered with a non-success status
    Remote,
    /// No response was received (connection, TLS, timeout)
    Transport,
    /// The response body did not have the expected shape
    Decode,
    /// Caller-provided data could not be used
    Input,
    /// The client could not be constructed
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Token acquisition or refresh failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The API answered with a non-success status
    #[error("{url} returned status {status}: {body}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Full request URL
        url: String,
        /// Response body, lossily decoded
        body: String,
    },

    /// The request did not complete
    #[error("Transport error: {0}")]
    Transport(String),

    /// The per-request deadline elapsed
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Caller-provided data was rejected before sending
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The client could not be built from its configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::Remote { .. } => ApiErrorCategory::Remote,
            Self::Transport(_) | Self::Timeout(_) => ApiErrorCategory::Transport,
            Self::Decode(_) => ApiErrorCategory::Decode,
            Self::InvalidInput(_) => ApiErrorCategory::Input,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// HTTP status of a remote error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<OfleetError> for ApiError {
    fn from(err: OfleetError) -> Self {
        match err {
            OfleetError::Network(message) | OfleetError::Internal(message) => {
                Self::Transport(message)
            }
            OfleetError::Auth(message) => Self::Auth(message),
            OfleetError::InvalidInput(message) => Self::InvalidInput(message),
            OfleetError::Config(message) => Self::Config(message),
        }
    }
}

impl From<TokenManagerError> for ApiError {
    fn from(err: TokenManagerError) -> Self {
        Self::Auth(err.to_string())
    }
}
