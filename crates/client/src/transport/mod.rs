//! Resilient transport to the upstream catalog.
//!
//! ### Per attempt
//! - Connect timeout 5s, total timeout 10s (configurable).
//! - Outcome is typed: [`Attempt::Success`], [`Attempt::Transient`] or
//!   [`Attempt::Terminal`].
//!
//! ### Retry policy
//! - Up to 3 attempts in total; only transient outcomes are retried
//!   (timeouts, connection failures without a response, 5xx).
//! - Linear backoff: `100ms × attempt` after a failed attempt.
//! - 4xx responses and malformed JSON bodies end the call immediately.
//! - Exhausting the attempts yields [`TransportError::Exhausted`], naming the
//!   logical operation and wrapping the last failure.
//!
//! ### Cancellation
//! A [`CancellationToken`] aborts the in-flight attempt and any pending
//! backoff; the call then fails with [`TransportError::Cancelled`].

pub mod error;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use error::TransportError;
pub use upstream::{HttpUpstream, Upstream, UpstreamResponse};

use std::sync::Arc;
use std::time::Duration;

use holonet_core::AppConfig;
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Default base URL of the upstream catalog.
const DEFAULT_BASE_URL: &str = "https://www.swapi.tech/api/";

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL relative paths are resolved against; ends with `/`.
    pub base_url: Url,
    pub user_agent: String,
    /// Connect timeout per attempt (default: 5s).
    pub connect_timeout: Duration,
    /// Total timeout per attempt (default: 10s).
    pub timeout: Duration,
    /// Attempts per call, including the first (default: 3).
    pub max_attempts: u32,
    /// Backoff before attempt `n + 1` is `backoff_step × n` (default: 100ms).
    pub backoff_step: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            user_agent: "holonet/0.1".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_step: Duration::from_millis(100),
        }
    }
}

impl TransportConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, TransportError> {
        Ok(Self {
            base_url: config.base_url()?,
            user_agent: config.user_agent.clone(),
            connect_timeout: config.connect_timeout(),
            timeout: config.timeout(),
            max_attempts: config.max_attempts,
            backoff_step: config.backoff_step(),
        })
    }
}

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt {
    Success(Value),
    Transient(TransportError),
    Terminal(TransportError),
}

impl Attempt {
    fn from_response(response: UpstreamResponse) -> Self {
        let status = response.status;

        if status.is_server_error() {
            return Attempt::Transient(TransportError::Server { status: status.as_u16() });
        }

        if !status.is_success() {
            return Attempt::Terminal(TransportError::Terminal { status: status.as_u16() });
        }

        match serde_json::from_slice(&response.body) {
            Ok(json) => Attempt::Success(json),
            Err(e) => Attempt::Terminal(TransportError::Decode(e.to_string())),
        }
    }

    fn from_send_error(err: TransportError) -> Self {
        if err.is_transient() { Attempt::Transient(err) } else { Attempt::Terminal(err) }
    }
}

/// Retrying JSON transport over an [`Upstream`].
#[derive(Clone)]
pub struct Transport {
    upstream: Arc<dyn Upstream>,
    config: TransportConfig,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Transport {
    /// Transport over a reqwest client built from `config`.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let upstream = HttpUpstream::new(&config)?;
        Ok(Self::with_upstream(config, Arc::new(upstream)))
    }

    pub fn with_upstream(config: TransportConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Resolve `path` to an upstream URL and append `query`.
    ///
    /// Absolute URLs are used as-is. Relative paths, with or without a
    /// leading `/`, are resolved beneath the base URL (`/films/3` →
    /// `{base}films/3`).
    pub fn resolve(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, TransportError> {
        let path = path.trim();
        let mut url = match Url::parse(path) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .config
                .base_url
                .join(path.trim_start_matches('/'))
                .map_err(|e| TransportError::InvalidUrl(format!("{path}: {e}")))?,
            Err(e) => return Err(TransportError::InvalidUrl(format!("{path}: {e}"))),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!("{path}: unsupported scheme")));
        }

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// `GET` shorthand for [`Transport::request`].
    pub async fn get(
        &self, operation: &str, path: &str, query: &[(&str, &str)], cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        self.request(operation, Method::GET, path, query, cancel).await
    }

    /// Perform a request with timeouts, retries and cancellation, returning the decoded JSON body.
    ///
    /// `operation` names the logical call (e.g. `searchPeople`) in logs and in
    /// [`TransportError::Exhausted`].
    pub async fn request(
        &self, operation: &str, method: Method, path: &str, query: &[(&str, &str)], cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = self.resolve(path, query)?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            tracing::debug!(operation, %url, attempt, "upstream request");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                outcome = self.attempt(method.clone(), &url) => outcome,
            };

            let err = match outcome {
                Attempt::Success(json) => return Ok(json),
                Attempt::Terminal(err) => {
                    tracing::warn!(operation, %url, attempt, error = %err, "upstream request failed, not retrying");
                    return Err(err);
                }
                Attempt::Transient(err) => err,
            };

            tracing::warn!(operation, %url, attempt, max_attempts, error = %err, "upstream attempt failed");

            if attempt >= max_attempts {
                tracing::error!(operation, %url, attempts = max_attempts, "upstream request failed after all attempts");
                return Err(TransportError::Exhausted {
                    operation: operation.to_string(),
                    attempts: max_attempts,
                    source: Box::new(err),
                });
            }

            let backoff = self.config.backoff_step * attempt;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }

            attempt += 1;
        }
    }

    async fn attempt(&self, method: Method, url: &Url) -> Attempt {
        match self.upstream.send(method, url.clone()).await {
            Ok(response) => Attempt::from_response(response),
            Err(err) => Attempt::from_send_error(err),
        }
    }
}
