//! In-memory cache of upstream API responses

use crate::{ArchiveError, Result};
use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::time::Duration;

/// In-memory cache of upstream responses with a fixed time-to-live.
///
/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct ResponseCache {
    store: Cache<String, Vec<u8>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let store = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { store }
    }

    /// Stores a serializable value under `key`.
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Debug>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ArchiveError::cache(format!("Failed to encode '{key}': {e}")))?;
        self.store.insert(key.to_string(), bytes).await;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(key).await else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!("Key found and still fresh");
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!("Dropping undecodable cache entry: {}", e);
                self.remove(key).await;
                Ok(None)
            }
        }
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) {
        self.store.invalidate(key).await;
    }
}
