//! Response storage.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// LRU of rendered page responses.
pub struct ResponseStore {
    responses: RwLock<LruCache<ResponseKey, CachedResponse>>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: RwLock::new(LruCache::new(config.response_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        rw_write(&self.responses, SOURCE, "get").get(key).cloned()
    }

    /// Insert a response, returning the key pushed out to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        rw_write(&self.responses, SOURCE, "set")
            .push(key.clone(), response)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key)
    }

    pub fn invalidate(&self, key: &ResponseKey) -> bool {
        rw_write(&self.responses, SOURCE, "invalidate")
            .pop(key)
            .is_some()
    }

    /// Drop every variant cached under `path`, returning the removed keys.
    pub fn invalidate_path(&self, path: &str) -> Vec<ResponseKey> {
        let mut responses = rw_write(&self.responses, SOURCE, "invalidate_path");
        let keys: Vec<ResponseKey> = responses
            .iter()
            .filter(|(key, _)| key.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            responses.pop(key);
        }
        keys
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
