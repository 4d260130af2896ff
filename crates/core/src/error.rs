//! Unified error types for holonet.
//!
//! Upstream failure detail never crosses this boundary: primary-fetch
//! failures collapse into [`Error::ServiceUnavailable`] before reaching a
//! tool caller.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Message shown to callers when the upstream catalog cannot be reached.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "External API service is temporarily unavailable. Please try again later.";

/// Unified error types for the holonet server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., malformed search term).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The upstream catalog failed; detail is logged, not surfaced.
    #[error("SERVICE_UNAVAILABLE")]
    ServiceUnavailable,

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored or produced JSON value could not be (de)serialized.
    #[error("CODEC_ERROR: {0}")]
    Codec(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::ServiceUnavailable => (-32003, SERVICE_UNAVAILABLE_MESSAGE.to_string()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Codec(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("the search query is required".to_string());
        assert!(err.to_string().contains("INVALID_INPUT"));
        assert!(err.to_string().contains("search query"));
    }

    #[test]
    fn test_service_unavailable_is_opaque() {
        let mcp_err: McpError = Error::ServiceUnavailable.into();
        assert_eq!(mcp_err.code.0, -32003);
        assert_eq!(mcp_err.message, SERVICE_UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn test_invalid_input_code() {
        let mcp_err: McpError = Error::InvalidInput("bad term".to_string()).into();
        assert_eq!(mcp_err.code.0, -32602);
        assert_eq!(mcp_err.message, "bad term");
    }
}
