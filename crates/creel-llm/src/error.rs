//! Error types for the completion service clients.

use thiserror::Error;

/// Errors that can occur during completion calls.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Configured provider name is not supported
    #[error("unknown completion provider: {0}")]
    UnknownProvider(String),

    /// No API key available for the provider
    #[error("no API key configured for {provider}")]
    MissingApiKey {
        /// Provider name
        provider: String,
    },

    /// API error with status code
    #[error("API error ({provider}): status {status}, {message}")]
    ApiError {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Response parsing error
    #[error("failed to parse response from {provider}: {message}")]
    ParseError {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The model answered with no text
    #[error("{provider} returned an empty completion")]
    EmptyResponse {
        /// Provider name
        provider: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for completion operations.
pub type Result<T> = std::result::Result<T, LlmError>;
