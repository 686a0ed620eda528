//! The response cache as a whole: storage plus tag bookkeeping.
//!
//! Every invalidation bumps a generation counter. A render snapshots the
//! generation before it starts and is only stored if no invalidation ran in
//! the meantime, so a page built from pre-upload data cannot outlive the
//! revalidation that followed the upload.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use metrics::counter;
use tracing::debug;

use crate::application::revalidation::CacheInvalidator;
use crate::domain::locale::Locale;

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::{ResponseKey, normalize_path};
use super::lock::{rw_read, rw_write};
use super::registry::TagRegistry;
use super::store::{CachedResponse, ResponseStore};

const METRIC_HIT: &str = "javea_cache_hit_total";
const METRIC_MISS: &str = "javea_cache_miss_total";
const METRIC_INVALIDATED: &str = "javea_cache_invalidated_total";
const SOURCE: &str = "cache::response";

/// Invalidation counter; see the module docs.
pub type Generation = u64;

pub struct ResponseCache {
    config: CacheConfig,
    store: ResponseStore,
    registry: TagRegistry,
    generation: RwLock<Generation>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let store = ResponseStore::new(&config);
        Self {
            config,
            store,
            registry: TagRegistry::new(),
            generation: RwLock::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn lookup(&self, key: &ResponseKey) -> Option<CachedResponse> {
        let cached = self.store.get(key);
        if cached.is_some() {
            counter!(METRIC_HIT).increment(1);
        } else {
            counter!(METRIC_MISS).increment(1);
        }
        cached
    }

    /// Snapshot to pass to [`ResponseCache::insert`] once the render is done.
    pub fn generation(&self) -> Generation {
        *rw_read(&self.generation, SOURCE, "generation")
    }

    /// Store a rendered response unless an invalidation ran since `rendered_at`.
    ///
    /// Returns whether the response was stored.
    pub fn insert(
        &self,
        key: ResponseKey,
        response: CachedResponse,
        tags: HashSet<String>,
        rendered_at: Generation,
    ) -> bool {
        let generation = rw_write(&self.generation, SOURCE, "insert");
        if *generation != rendered_at {
            debug!(
                path = %key.path,
                rendered_at,
                current = *generation,
                "Discarding response rendered before an invalidation"
            );
            return false;
        }
        if let Some(evicted) = self.store.set(key.clone(), response) {
            self.registry.unregister(&evicted);
        }
        self.registry.register(key, tags);
        true
    }

    /// Drop every response tagged `tag`.
    pub fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(CacheError::InvalidTag);
        }
        let mut generation = rw_write(&self.generation, SOURCE, "invalidate_tag");
        *generation = generation.wrapping_add(1);
        if !self.config.enabled {
            return Ok(0);
        }

        let mut dropped = 0;
        for key in self.registry.keys_for_tag(tag) {
            if self.store.invalidate(&key) {
                dropped += 1;
            }
            self.registry.unregister(&key);
        }

        counter!(METRIC_INVALIDATED, "kind" => "tag").increment(dropped as u64);
        debug!(tag, dropped, "Invalidated tagged responses");
        Ok(dropped)
    }

    /// Drop every locale and query variant of the page at `path`.
    ///
    /// `/es/sale` and `/sale` name the same page.
    pub fn invalidate_path(&self, path: &str) -> Result<usize, CacheError> {
        let normalized = normalize_path(path)?;
        let path = Locale::split_path(&normalized).1.to_string();
        let mut generation = rw_write(&self.generation, SOURCE, "invalidate_path");
        *generation = generation.wrapping_add(1);
        if !self.config.enabled {
            return Ok(0);
        }

        let keys = self.store.invalidate_path(&path);
        for key in &keys {
            self.registry.unregister(key);
        }

        counter!(METRIC_INVALIDATED, "kind" => "path").increment(keys.len() as u64);
        debug!(path = %path, dropped = keys.len(), "Invalidated path responses");
        Ok(keys.len())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl CacheInvalidator for ResponseCache {
    async fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError> {
        ResponseCache::invalidate_tag(self, tag)
    }

    async fn invalidate_path(&self, path: &str) -> Result<usize, CacheError> {
        ResponseCache::invalidate_path(self, path)
    }
}
