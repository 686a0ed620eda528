//! Bidirectional tag registry.
//!
//! Tracks which cached responses carry which tags, so a tag can be turned
//! into the set of keys to drop and a dropped key can be forgotten by every
//! tag that referenced it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::ResponseKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

#[derive(Default)]
struct Maps {
    tag_to_keys: HashMap<String, HashSet<ResponseKey>>,
    key_to_tags: HashMap<ResponseKey, HashSet<String>>,
}

#[derive(Default)]
pub struct TagRegistry {
    maps: RwLock<Maps>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tags recorded for `key`.
    pub fn register(&self, key: ResponseKey, tags: HashSet<String>) {
        let mut maps = rw_write(&self.maps, SOURCE, "register");
        detach(&mut maps, &key);
        for tag in &tags {
            maps.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        maps.key_to_tags.insert(key, tags);
    }

    pub fn keys_for_tag(&self, tag: &str) -> HashSet<ResponseKey> {
        rw_read(&self.maps, SOURCE, "keys_for_tag")
            .tag_to_keys
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_key(&self, key: &ResponseKey) -> HashSet<String> {
        rw_read(&self.maps, SOURCE, "tags_for_key")
            .key_to_tags
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget `key`; called when its response is evicted or invalidated.
    pub fn unregister(&self, key: &ResponseKey) {
        let mut maps = rw_write(&self.maps, SOURCE, "unregister");
        detach(&mut maps, key);
    }

    /// Number of tags with at least one live key.
    pub fn tag_count(&self) -> usize {
        rw_read(&self.maps, SOURCE, "tag_count").tag_to_keys.len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.maps, SOURCE, "key_count").key_to_tags.len()
    }
}

fn detach(maps: &mut Maps, key: &ResponseKey) {
    let Some(tags) = maps.key_to_tags.remove(key) else {
        return;
    };
    for tag in tags {
        if let Some(keys) = maps.tag_to_keys.get_mut(&tag) {
            keys.remove(key);
            if keys.is_empty() {
                maps.tag_to_keys.remove(&tag);
            }
        }
    }
}
