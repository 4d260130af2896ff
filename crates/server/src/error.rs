//! Upstream failure mapping for tool results.
//!
//! Transport detail is logged here and never reaches a tool caller: every
//! primary-fetch failure becomes [`Error::ServiceUnavailable`].

use holonet_client::TransportError;
use holonet_core::Error;

/// Collapse a transport failure for `what` (e.g. `person 4`) into the opaque caller-facing error.
pub fn upstream_failure(what: &str, err: TransportError) -> Error {
    match &err {
        TransportError::Cancelled => tracing::debug!(resource = what, "request cancelled"),
        e if e.is_not_found() => tracing::info!(resource = what, status = 404, "upstream reports resource not found"),
        TransportError::Exhausted { operation, attempts, source } => tracing::error!(
            resource = what,
            operation = %operation,
            attempts,
            cause = %source,
            "upstream unavailable"
        ),
        other => tracing::error!(resource = what, error = %other, "upstream request failed"),
    }

    Error::ServiceUnavailable
}
