//! Transport error types.

use holonet_core::ConfigError;

/// Errors from the resilient transport.
///
/// `Timeout`, `Network` and `Server` are transient and retried; `Terminal`,
/// `Decode` and `Cancelled` end the call after the attempt that produced them.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Attempt exceeded its connect or total timeout.
    #[error("request timeout")]
    Timeout,

    /// No response: DNS, TLS, refused or reset connection.
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a 5xx status.
    #[error("upstream server error: HTTP {status}")]
    Server { status: u16 },

    /// Upstream answered with a 4xx (or otherwise unusable) status.
    #[error("upstream rejected request: HTTP {status}")]
    Terminal { status: u16 },

    /// A successful response carried a malformed JSON body.
    #[error("invalid JSON from upstream: {0}")]
    Decode(String),

    /// All attempts failed transiently; wraps the last failure.
    #[error("{operation} failed after {attempts} attempts")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<TransportError>,
    },

    /// The caller abandoned the request.
    #[error("request cancelled")]
    Cancelled,

    /// Path or reference could not be turned into an upstream URL.
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TransportError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_) | Self::Server { .. })
    }

    /// HTTP status of the (last) upstream response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status } | Self::Terminal { status } => Some(*status),
            Self::Exhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Terminal { status: 404 })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Client(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
