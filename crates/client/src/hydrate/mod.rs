//! Resource hydration.
//!
//! A person's `films` and a film's `characters` arrive as lists of URLs.
//! Hydration replaces each URL with a one-level [`Summary`] of the entity
//! it points to, keeping the original order.
//!
//! ### Caching
//! - Primary documents are cached raw under `person:{id}` / `film:{id}`.
//! - Summaries are cached under `film-summary:{id}` / `person-summary:{id}`
//!   and shared by every entity referencing them.
//! - Placeholders for failed nested fetches are never cached.

pub mod model;

pub use model::{Entity, Label, Summary, UNKNOWN};

use std::time::Duration;

use futures_util::{StreamExt, stream};
use holonet_core::{AppConfig, CacheAside, ResourceKind};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::resolve::{id_from_url, kind_from_url};
use crate::transport::{Transport, TransportError};

const FETCH_OPERATION: &str = "fetchResource";

/// Fetches people and films and expands their cross-references.
#[derive(Debug, Clone)]
pub struct Hydrator {
    transport: Transport,
    cache: CacheAside,
    ttl: Duration,
    concurrency: usize,
}

impl Hydrator {
    pub fn new(transport: Transport, cache: CacheAside, ttl: Duration, concurrency: usize) -> Self {
        Self { transport, cache, ttl, concurrency: concurrency.max(1) }
    }

    pub fn from_config(transport: Transport, cache: CacheAside, config: &AppConfig) -> Self {
        Self::new(transport, cache, config.cache_ttl(), config.hydrate_concurrency)
    }

    pub async fn get_person(&self, id: u64, cancel: &CancellationToken) -> Result<Entity, TransportError> {
        self.get(ResourceKind::Person, id, cancel).await
    }

    pub async fn get_film(&self, id: u64, cancel: &CancellationToken) -> Result<Entity, TransportError> {
        self.get(ResourceKind::Film, id, cancel).await
    }

    /// Fetch (or reuse) the entity and replace its cross-references with summaries.
    ///
    /// Only the primary fetch can fail; failed references degrade to
    /// `"Unknown"` placeholders. Cancellation returns at once, including while
    /// queued behind another request computing the same cache key.
    pub async fn get(&self, kind: ResourceKind, id: u64, cancel: &CancellationToken) -> Result<Entity, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            entity = self.load(kind, id, cancel) => entity,
        }
    }

    async fn load(&self, kind: ResourceKind, id: u64, cancel: &CancellationToken) -> Result<Entity, TransportError> {
        let key = kind.cache_key(id);
        let path = format!("{}/{}/", kind.segment(), id);

        let payload: Value = self
            .cache
            .get_or_compute(&key, self.ttl, || self.transport.get(kind.get_operation(), &path, &[], cancel))
            .await?;

        let payload = self.hydrate(kind, payload, cancel).await;

        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        Ok(Entity { id, kind, payload })
    }

    /// Best-effort raw fetch of several resources, in input order.
    ///
    /// Each document gets a top-level `"id"` when the URL resolves to one.
    /// Failing URLs are logged and skipped.
    pub async fn fetch_many(&self, urls: &[String], cancel: &CancellationToken) -> Vec<Value> {
        stream::iter(urls)
            .map(|url| async move {
                let operation = kind_from_url(url).map_or(FETCH_OPERATION, ResourceKind::get_operation);
                (url, self.transport.get(operation, url, &[], cancel).await)
            })
            .buffered(self.concurrency)
            .filter_map(|(url, result)| async move {
                match result {
                    Ok(mut doc) => {
                        if let (Some(id), Value::Object(map)) = (id_from_url(url), &mut doc) {
                            map.insert("id".to_string(), Value::from(id));
                        }
                        Some(doc)
                    }
                    Err(error) => {
                        tracing::warn!(%url, %error, "skipping resource");
                        None
                    }
                }
            })
            .collect()
            .await
    }

    /// Numeric id at the end of a resource URL.
    pub fn extract_id(url: &str) -> Option<u64> {
        id_from_url(url)
    }

    async fn hydrate(&self, kind: ResourceKind, mut payload: Value, cancel: &CancellationToken) -> Value {
        let field = kind.reference_field();

        let references: Vec<String> = match payload.pointer(&format!("/result/properties/{field}")) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        };

        let resolved: Vec<(u64, String)> = references
            .into_iter()
            .filter_map(|url| match id_from_url(&url) {
                Some(id) => Some((id, url)),
                None => {
                    tracing::debug!(%url, "dropping unresolvable reference");
                    None
                }
            })
            .collect();

        let referenced = kind.referenced_kind();
        let summaries: Vec<Summary> = stream::iter(resolved)
            .map(|(id, url)| async move { self.summary(referenced, id, &url, cancel).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Some(props) = payload.pointer_mut("/result/properties").and_then(Value::as_object_mut) {
            let summaries = summaries
                .into_iter()
                .filter_map(|s| serde_json::to_value(s).ok())
                .collect();
            props.insert(field.to_string(), Value::Array(summaries));
        }

        payload
    }

    async fn summary(&self, kind: ResourceKind, id: u64, url: &str, cancel: &CancellationToken) -> Summary {
        let key = kind.summary_key(id);
        let result = self
            .cache
            .get_or_compute(&key, self.ttl, || async {
                let payload = self.transport.get(kind.get_operation(), url, &[], cancel).await?;
                Ok::<_, TransportError>(Summary::from_payload(kind, id, url, &payload))
            })
            .await;

        match result {
            Ok(summary) => summary,
            Err(error) => {
                tracing::warn!(%url, id, %error, "failed to fetch reference, using placeholder");
                Summary::unknown(kind, id, url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::transport::testing::{Reply, ScriptedUpstream};
    use serde_json::json;

    fn hydrator(upstream: &Arc<ScriptedUpstream>) -> Hydrator {
        let transport = Transport::with_upstream(ScriptedUpstream::config(), upstream.clone());
        Hydrator::new(transport, CacheAside::in_memory(), Duration::from_secs(3600), 4)
    }

    fn person(name: &str, films: Value) -> Value {
        json!({"message": "ok", "result": {"uid": "4", "properties": {"name": name, "films": films}}})
    }

    fn film(title: &str) -> Value {
        json!({"message": "ok", "result": {"properties": {"title": title, "characters": []}}})
    }

    #[tokio::test]
    async fn test_get_person_hydrates_films_in_order() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/people/4/", [Reply::json(200, person("Darth Vader", json!(["/films/1", "/films/6"])))]);
        upstream.script("/api/films/1", [Reply::json(200, film("A New Hope"))]);
        upstream.script("/api/films/6", [Reply::json(200, film("Revenge of the Sith"))]);

        let entity = hydrator(&upstream).get_person(4, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            entity.to_json()["result"]["properties"]["films"],
            json!([
                {"id": 1, "url": "/films/1", "title": "A New Hope"},
                {"id": 6, "url": "/films/6", "title": "Revenge of the Sith"},
            ])
        );
        assert_eq!(entity.to_json()["id"], 4);
        assert_eq!(entity.references().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reference_degrades_and_is_not_cached() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/people/1/", [Reply::json(200, person("Luke Skywalker", json!(["/films/1", "/films/2"])))]);
        upstream.script("/api/films/1", [Reply::json(200, film("A New Hope"))]);
        upstream.script("/api/films/2", [Reply::status(500)]);
        let hydrator = hydrator(&upstream);

        let entity = hydrator.get_person(1, &CancellationToken::new()).await.unwrap();
        let films = entity.references();
        assert_eq!(films[0].label.as_str(), "A New Hope");
        assert_eq!(films[1], Summary::unknown(ResourceKind::Film, 2, "/films/2"));
        assert_eq!(upstream.calls_to("/api/films/2"), 3);

        hydrator.get_person(1, &CancellationToken::new()).await.unwrap();
        assert_eq!(upstream.calls_to("/api/people/1/"), 1);
        assert_eq!(upstream.calls_to("/api/films/1"), 1);
        assert_eq!(upstream.calls_to("/api/films/2"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_order_kept_when_first_reference_is_slowest() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script(
            "/api/people/1/",
            [Reply::json(200, person("Luke Skywalker", json!(["/films/1", "/films/2", "/films/3"])))],
        );
        upstream.script("/api/films/1", [Reply::json(200, film("A New Hope")).after(Duration::from_millis(300))]);
        upstream.script("/api/films/2", [Reply::json(200, film("The Empire Strikes Back")).after(Duration::from_millis(100))]);
        upstream.script("/api/films/3", [Reply::json(200, film("Return of the Jedi"))]);

        let entity = hydrator(&upstream).get_person(1, &CancellationToken::new()).await.unwrap();

        let titles: Vec<String> = entity.references().iter().map(|s| s.label.as_str().to_string()).collect();
        assert_eq!(titles, ["A New Hope", "The Empire Strikes Back", "Return of the Jedi"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_does_not_wait_for_slow_fetch() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/films/1/", [Reply::json(200, film("A New Hope")).after(Duration::from_secs(3))]);
        let hydrator = hydrator(&upstream);

        let first = {
            let hydrator = hydrator.clone();
            tokio::spawn(async move { hydrator.get_film(1, &CancellationToken::new()).await })
        };
        tokio::task::yield_now().await;

        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                cancel.cancel();
            })
        };

        let start = tokio::time::Instant::now();
        let err = hydrator.get_film(1, &cancel).await.unwrap_err();

        assert!(matches!(err, TransportError::Cancelled));
        assert_eq!(start.elapsed(), Duration::from_millis(100));

        canceller.await.unwrap();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(upstream.calls_to("/api/films/1/"), 1);
    }

    #[tokio::test]
    async fn test_get_film_twice_fetches_once() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/films/7/", [Reply::json(200, film("The Force Awakens"))]);
        let hydrator = hydrator(&upstream);
        let cancel = CancellationToken::new();

        let first = hydrator.get_film(7, &cancel).await.unwrap();
        let second = hydrator.get_film(7, &cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(upstream.calls_to("/api/films/7/"), 1);
    }

    #[tokio::test]
    async fn test_film_characters_use_name() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script(
            "/api/films/1/",
            [Reply::json(
                200,
                json!({"result": {"properties": {"title": "A New Hope", "characters": ["https://swapi.test/api/people/1"]}}}),
            )],
        );
        upstream.script("/api/people/1", [Reply::json(200, json!({"result": {"properties": {"name": "Luke Skywalker"}}}))]);

        let entity = hydrator(&upstream).get_film(1, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            entity.to_json()["result"]["properties"]["characters"],
            json!([{"id": 1, "url": "https://swapi.test/api/people/1", "name": "Luke Skywalker"}])
        );
    }

    #[tokio::test]
    async fn test_summaries_shared_between_entities() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/people/1/", [Reply::json(200, person("Luke Skywalker", json!(["/films/1"])))]);
        upstream.script("/api/people/2/", [Reply::json(200, person("C-3PO", json!(["/films/1"])))]);
        upstream.script("/api/films/1", [Reply::json(200, film("A New Hope"))]);
        let hydrator = hydrator(&upstream);
        let cancel = CancellationToken::new();

        hydrator.get_person(1, &cancel).await.unwrap();
        hydrator.get_person(2, &cancel).await.unwrap();

        assert_eq!(upstream.calls_to("/api/films/1"), 1);
    }

    #[tokio::test]
    async fn test_primary_failure_is_returned() {
        let upstream = Arc::new(ScriptedUpstream::new());

        let err = hydrator(&upstream).get_person(99, &CancellationToken::new()).await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unresolvable_references_dropped() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script(
            "/api/people/1/",
            [Reply::json(200, person("Luke Skywalker", json!(["/films/1", "not-a-url", "/films/abc/", 42])))],
        );
        upstream.script("/api/films/1", [Reply::json(200, film("A New Hope"))]);

        let entity = hydrator(&upstream).get_person(1, &CancellationToken::new()).await.unwrap();

        assert_eq!(entity.references().len(), 1);
        assert_eq!(upstream.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_non_array_reference_field_becomes_empty() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/people/3/", [Reply::json(200, person("R2-D2", json!("n/a")))]);
        upstream.script(
            "/api/films/3/",
            [Reply::json(200, json!({"result": {"properties": {"title": "Return of the Jedi"}}}))],
        );
        let hydrator = hydrator(&upstream);
        let cancel = CancellationToken::new();

        let person = hydrator.get_person(3, &cancel).await.unwrap();
        assert_eq!(person.payload["result"]["properties"]["films"], json!([]));

        let film = hydrator.get_film(3, &cancel).await.unwrap();
        assert_eq!(film.payload["result"]["properties"]["characters"], json!([]));
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/films/1/", [Reply::json(200, film("A New Hope"))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = hydrator(&upstream).get_film(1, &cancel).await.unwrap_err();

        assert!(matches!(err, TransportError::Cancelled));
        assert_eq!(upstream.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_many_skips_failures() {
        let upstream = Arc::new(ScriptedUpstream::new());
        upstream.script("/api/people/1/", [Reply::json(200, json!({"result": {"properties": {"name": "Luke"}}}))]);
        upstream.script("/api/films/3/", [Reply::json(200, json!({"result": {"properties": {"title": "Jedi"}}}))]);
        let urls = vec![
            "/people/1/".to_string(),
            "/people/2/".to_string(),
            "https://swapi.test/api/films/3/".to_string(),
        ];

        let docs = hydrator(&upstream).fetch_many(&urls, &CancellationToken::new()).await;

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["id"], 1);
        assert_eq!(docs[1]["id"], 3);
        assert_eq!(docs[1]["result"]["properties"]["title"], "Jedi");
    }

    #[test]
    fn test_extract_id() {
        assert_eq!(Hydrator::extract_id("https://www.swapi.tech/api/people/42/"), Some(42));
        assert_eq!(Hydrator::extract_id("https://www.swapi.tech/api/people/"), None);
    }
}
