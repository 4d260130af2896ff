//! Free-text search against the upstream catalog.
//!
//! Searches are neither cached nor hydrated: the upstream body is returned
//! as received, optionally annotated with resolved ids.

pub mod query;

pub use query::{MAX_TERM_CHARS, SearchQuery};

use holonet_core::ResourceKind;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::resolve::id_from_url;
use crate::transport::{Transport, TransportError};

/// Upstream search response for one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub kind: ResourceKind,
    pub raw: Value,
}

impl SearchResults {
    /// Listed entities, whichever key the upstream used (`results` or `result`).
    pub fn items(&self) -> &[Value] {
        ["results", "result"]
            .iter()
            .find_map(|key| self.raw.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Upstream-reported total, else the number of listed entities.
    pub fn count(&self) -> u64 {
        ["count", "total_records"]
            .iter()
            .find_map(|key| self.raw.get(*key).and_then(Value::as_u64))
            .unwrap_or(self.items().len() as u64)
    }

    /// The raw response with every listed entity given a top-level `"id"`,
    /// resolved from its `url` or, failing that, its `uid`.
    pub fn with_ids(&self) -> Value {
        let mut raw = self.raw.clone();

        for key in ["results", "result"] {
            let Some(items) = raw.get_mut(key).and_then(Value::as_array_mut) else {
                continue;
            };
            for item in items {
                let id = entity_id(item);
                if let Value::Object(map) = item {
                    map.insert("id".to_string(), id.map_or(Value::Null, Value::from));
                }
            }
        }

        raw
    }
}

fn entity_id(item: &Value) -> Option<u64> {
    item.get("url")
        .or_else(|| item.pointer("/properties/url"))
        .and_then(Value::as_str)
        .and_then(id_from_url)
        .or_else(|| match item.get("uid") {
            Some(Value::String(uid)) => uid.parse().ok(),
            Some(uid) => uid.as_u64(),
            None => None,
        })
}

/// Issues name/title searches through the resilient transport.
#[derive(Debug, Clone)]
pub struct SearchGateway {
    transport: Transport,
}

impl SearchGateway {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// `GET people/?name={term}`
    pub async fn search_people(&self, term: &str, cancel: &CancellationToken) -> Result<SearchResults, TransportError> {
        self.search(ResourceKind::Person, term, cancel).await
    }

    /// `GET films/?title={term}`
    pub async fn search_films(&self, term: &str, cancel: &CancellationToken) -> Result<SearchResults, TransportError> {
        self.search(ResourceKind::Film, term, cancel).await
    }

    pub async fn search(
        &self, kind: ResourceKind, term: &str, cancel: &CancellationToken,
    ) -> Result<SearchResults, TransportError> {
        let path = format!("{}/", kind.segment());
        let raw = self
            .transport
            .get(kind.search_operation(), &path, &[(kind.search_param(), term)], cancel)
            .await?;

        Ok(SearchResults { kind, raw })
    }

    /// Run a validated [`SearchQuery`].
    pub async fn run(&self, query: &SearchQuery, cancel: &CancellationToken) -> Result<SearchResults, TransportError> {
        self.search(query.kind, &query.term, cancel).await
    }
}
