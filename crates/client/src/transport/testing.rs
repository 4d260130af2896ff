//! Scripted [`Upstream`] double for transport, hydrator and search tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use url::Url;

use super::{TransportConfig, TransportError, Upstream, UpstreamResponse};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Json(u16, Value),
    Raw(u16, String),
    Timeout,
    Network,
    /// The inner reply, after a pause on tokio's clock.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub(crate) fn json(status: u16, value: Value) -> Self {
        Reply::Json(status, value)
    }

    pub(crate) fn status(status: u16) -> Self {
        Reply::Json(status, json!({"message": "scripted"}))
    }

    pub(crate) fn raw(status: u16, body: &str) -> Self {
        Reply::Raw(status, body.to_string())
    }

    pub(crate) fn after(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }
}

/// Replies keyed by URL path. Each call pops the next reply; the last reply
/// repeats. Unscripted paths answer 404.
#[derive(Debug, Default)]
pub(crate) struct ScriptedUpstream {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Transport config pointing at the scripted host with the default retry policy.
    pub(crate) fn config() -> TransportConfig {
        TransportConfig { base_url: Url::parse("https://swapi.test/api/").unwrap(), ..TransportConfig::default() }
    }

    pub(crate) fn script(&self, path: &str, replies: impl IntoIterator<Item = Reply>) {
        self.replies.lock().unwrap().insert(path.to_string(), replies.into_iter().collect());
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Full URLs requested, in call order.
    pub(crate) fn requested(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(path)?;
        if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, _method: Method, url: Url) -> Result<UpstreamResponse, TransportError> {
        let path = url.path().to_string();
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;
        self.urls.lock().unwrap().push(url.to_string());

        let mut reply = self.next_reply(&path);
        while let Some(Reply::Delayed(delay, inner)) = reply {
            tokio::time::sleep(delay).await;
            reply = Some(*inner);
        }

        let (status, body) = match reply {
            Some(Reply::Json(status, value)) => (status, value.to_string()),
            Some(Reply::Raw(status, body)) => (status, body),
            Some(Reply::Timeout) => return Err(TransportError::Timeout),
            Some(Reply::Network) => return Err(TransportError::Network("connection reset".into())),
            Some(Reply::Delayed(..)) | None => (404, json!({"message": "not found"}).to_string()),
        };

        Ok(UpstreamResponse { status: StatusCode::from_u16(status).unwrap(), body: Bytes::from(body) })
    }
}
