//! Search-query log and usage statistics.
//!
//! Every catalog search is appended to `search_queries`; a periodic job
//! aggregates that log into the `statistics` table, one JSON document per
//! statistic key.

pub mod aggregate;

pub use aggregate::{
    AverageResponseTime, PopularHour, StatisticsSnapshot, TopQuery, TotalSearches, TypeShare,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use crate::cache::entries::timestamp;
use crate::{CacheDb, Error, ResourceKind};

/// One logged search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub term: String,
    pub kind: ResourceKind,
    pub results_count: u64,
    pub response_time_ms: f64,
    pub recorded_at: DateTime<Utc>,
}

impl SearchRecord {
    /// A record stamped with the current time.
    pub fn now(term: impl Into<String>, kind: ResourceKind, results_count: u64, response_time_ms: f64) -> Self {
        Self { term: term.into(), kind, results_count, response_time_ms, recorded_at: Utc::now() }
    }
}

/// Sink for search-query records.
#[async_trait]
pub trait QueryLog: Send + Sync {
    async fn record(&self, record: SearchRecord) -> Result<(), Error>;
}

#[async_trait]
impl QueryLog for CacheDb {
    async fn record(&self, record: SearchRecord) -> Result<(), Error> {
        let results_count = i64::try_from(record.results_count).unwrap_or(i64::MAX);
        let created_at = timestamp(record.recorded_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO search_queries (search_term, search_type, results_count, response_time, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![record.term, record.kind.segment(), results_count, record.response_time_ms, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Number of logged searches.
    pub async fn search_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM search_queries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_search() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.search_count().await.unwrap(), 0);

        db.record(SearchRecord::now("luke", ResourceKind::Person, 1, 120.5)).await.unwrap();
        db.record(SearchRecord::now("hope", ResourceKind::Film, 1, 80.0)).await.unwrap();

        assert_eq!(db.search_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_record_stores_collection_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.record(SearchRecord::now("r2", ResourceKind::Person, 0, 10.0)).await.unwrap();

        let kind: String = db
            .conn
            .call(|conn| conn.query_row("SELECT search_type FROM search_queries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(kind, "people");
    }
}
