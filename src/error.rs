//! Error types for the EVSE kiosk.

use thiserror::Error;

/// Errors that can occur when talking to the charging backend.
///
/// A backend that reports `isError` is *not* an error here: that is a
/// normal status rendered as [`DisplayStatus::Error`](crate::DisplayStatus::Error).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// HTTP request failed (connection refused, timeout, etc.)
    #[error("network error: {0}")]
    Network(String),

    /// Backend returned a non-2xx status code
    #[error("backend returned error status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// Invalid kiosk configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure happened on the wire rather than in decoding.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Api { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
