//! Shared collaborators handed to every tool.

use std::sync::Arc;

use holonet_client::{Hydrator, SearchGateway, Transport};
use holonet_core::{AppConfig, CacheAside, CacheBackend, CacheDb, CacheStore, MemoryCache, QueryLog};

/// Everything a tool call needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub hydrator: Hydrator,
    pub gateway: SearchGateway,
    pub query_log: Arc<dyn QueryLog>,
    pub db: CacheDb,
}

impl AppState {
    /// Wire the hydrator, gateway and query log over `transport` and `db`.
    ///
    /// The resource cache lives in memory or in `db`, per `config.cache_backend`;
    /// the query log and statistics always use `db`.
    pub fn new(config: &AppConfig, transport: Transport, db: CacheDb) -> Self {
        let store: Arc<dyn CacheStore> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Sqlite => Arc::new(db.clone()),
        };
        tracing::info!(backend = ?config.cache_backend, "resource cache ready");

        let cache = CacheAside::new(store);
        let hydrator = Hydrator::from_config(transport.clone(), cache, config);
        let gateway = SearchGateway::new(transport);

        Self { hydrator, gateway, query_log: Arc::new(db.clone()), db }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture upstream and state builder for tool tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use holonet_client::transport::{Upstream, UpstreamResponse};
    use holonet_client::{TransportConfig, TransportError};
    use reqwest::{Method, StatusCode};
    use serde_json::Value;
    use url::Url;

    use super::*;

    /// Answers fixed JSON per URL path; unknown paths answer 404.
    #[derive(Default)]
    pub struct FixtureUpstream {
        routes: Mutex<HashMap<String, (u16, Value)>>,
        calls: Mutex<Vec<String>>,
    }

    impl FixtureUpstream {
        pub fn route(&self, path: &str, status: u16, body: Value) {
            self.routes.lock().unwrap().insert(path.to_string(), (status, body));
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for FixtureUpstream {
        async fn send(&self, _method: Method, url: Url) -> Result<UpstreamResponse, TransportError> {
            self.calls.lock().unwrap().push(url.path().to_string());
            let (status, body) = self
                .routes
                .lock()
                .unwrap()
                .get(url.path())
                .cloned()
                .unwrap_or((404, serde_json::json!({"message": "not found"})));

            Ok(UpstreamResponse { status: StatusCode::from_u16(status).unwrap(), body: body.to_string().into() })
        }
    }

    pub async fn state(upstream: &Arc<FixtureUpstream>) -> AppState {
        let config = TransportConfig {
            base_url: Url::parse("https://swapi.test/api/").unwrap(),
            backoff_step: std::time::Duration::ZERO,
            ..TransportConfig::default()
        };
        let transport = Transport::with_upstream(config, upstream.clone());
        let db = CacheDb::open_in_memory().await.unwrap();

        AppState::new(&AppConfig::default(), transport, db)
    }
}
