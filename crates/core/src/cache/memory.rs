//! In-memory cache backend.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use super::CacheStore;
use crate::Error;

#[derive(Debug)]
struct MemoryEntry {
    value: Value,
    expires_at: Instant,
}

/// Process-lifetime [`CacheStore`].
///
/// Expiry uses tokio's clock, so tests can drive it with a paused runtime.
/// Expired entries stay in the map until the key is written again.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), Error> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| Error::Codec(format!("ttl out of range: {ttl:?}")))?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }
}
