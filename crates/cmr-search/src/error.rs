//! Error types for CMR search queries.

use thiserror::Error;

/// Result type alias using CmrError.
pub type CmrResult<T> = Result<T, CmrError>;

/// Primary error type for CMR query construction and retrieval.
#[derive(Debug, Error)]
pub enum CmrError {
    // === Construction Errors ===
    #[error("Missing required value for '{0}'")]
    MissingValue(&'static str),

    #[error("Invalid value for '{param}': {message}")]
    InvalidValue { param: &'static str, message: String },

    #[error("Wrong argument type for '{param}': expected {expected}")]
    WrongType {
        param: &'static str,
        expected: &'static str,
    },

    #[error("Unknown query parameter: {0}")]
    UnknownParameter(String),

    #[error("Unsupported result format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid CMR endpoint mode: {0}")]
    InvalidMode(String),

    // === State Errors ===
    #[error("Invalid query state: {0}")]
    InvalidState(String),

    // === Transport Errors ===
    #[error("CMR request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed CMR response: {0}")]
    MalformedResponse(String),
}

impl CmrError {
    /// Shorthand for an invalid-value error.
    pub(crate) fn invalid(param: &'static str, message: impl Into<String>) -> Self {
        CmrError::InvalidValue {
            param,
            message: message.into(),
        }
    }
}
