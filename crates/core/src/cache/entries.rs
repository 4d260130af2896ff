//! SQLite-backed resource cache entries.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC so that
//! expiry checks can compare them lexically in SQL.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio_rusqlite::params;

use super::CacheStore;
use super::connection::CacheDb;
use crate::Error;

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let key = key.to_string();
        let now = timestamp(Utc::now());

        let raw = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT value_json FROM resource_cache WHERE key = ?1 AND expires_at > ?2")?;

                match stmt.query_row(params![key, now], |row| row.get(0)) {
                    Ok(json) => Ok(Some(json)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(|json| serde_json::from_str(&json).map_err(Error::from)).transpose()
    }

    /// Upserts the entry: inserts if the key doesn't exist, overwrites value and timestamps if it does.
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let value_json = serde_json::to_string(&value)?;

        let stored_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::Codec(format!("ttl out of range: {e}")))?;
        let expires_at = timestamp(stored_at + ttl);
        let stored_at = timestamp(stored_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO resource_cache (key, value_json, stored_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value_json = excluded.value_json,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![key, value_json, stored_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Delete expired resource cache entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM resource_cache WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
