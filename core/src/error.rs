//! Error types for the Direct API client.
//!
//! # Design
//! `Authentication` gets a dedicated variant because callers routinely need
//! to tell "these credentials are wrong" apart from every other server
//! failure. Any other server-reported code lands in `Remote` with the method
//! name attached. Network and JSON failures are carried through unchanged.

use thiserror::Error;

use crate::http::TransportError;

/// Errors returned by `Client` operations and the envelope parsers.
#[derive(Debug, Error)]
pub enum DirectError {
    /// The server answered with error code 53, or the OAuth server issued no
    /// access token.
    #[error("{0}")]
    Authentication(String),

    /// The server reported an error other than an authentication failure.
    #[error("Error {code} calling method {method}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },

    /// The response parsed as JSON but does not follow the envelope contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The caller passed an argument the API cannot accept.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// The settings file is unreadable as a credential triple.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(TransportError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DirectError {
    /// Whether the failure means the login/token pair was rejected.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, DirectError::Authentication(_))
    }

    /// Server error code, when the server reported one.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            DirectError::Authentication(_) => Some(crate::envelope::AUTH_ERROR_CODE),
            DirectError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for Direct API operations.
pub type Result<T> = std::result::Result<T, DirectError>;
