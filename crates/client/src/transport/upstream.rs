//! The single-exchange HTTP seam beneath the transport.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode, header};
use url::Url;

use super::{TransportConfig, TransportError};

/// Raw upstream response: status and body, nothing decoded yet.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Performs one HTTP exchange. Retrying and decoding live above this trait.
///
/// An `Err` means no response was obtained (timeout, connection failure).
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, method: Method, url: Url) -> Result<UpstreamResponse, TransportError>;
}

/// reqwest-backed [`Upstream`] with per-attempt connect and total timeouts.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    http: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, method: Method, url: Url) -> Result<UpstreamResponse, TransportError> {
        let response = self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        Ok(UpstreamResponse { status, body })
    }
}
