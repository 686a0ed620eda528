//! Cache keys and tag names.
//!
//! A response is keyed by its logical path (locale prefix removed) plus a
//! variant hash of locale and query string. Invalidating a path therefore
//! drops every language and every query variant of that page at once.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::domain::{locale::Locale, property::PropertyCategory};

use super::error::CacheError;

/// Tag carried by every response derived from property data.
pub const PROPERTIES_TAG: &str = "properties";

pub fn property_tag(id: &str) -> String {
    format!("property:{id}")
}

pub fn category_tag(category: PropertyCategory) -> String {
    format!("category:{}", category.listed_under().as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub variant: u64,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, locale: Locale, query: &str) -> Self {
        Self {
            path: path.into(),
            variant: hash_variant(locale, query),
        }
    }
}

/// Strip the query and any trailing slash (except on the root).
pub fn normalize_path(path: &str) -> Result<String, CacheError> {
    let path = path.trim();
    if !path.starts_with('/') {
        return Err(CacheError::InvalidPath(path.to_string()));
    }
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = without_query.trim_end_matches('/');
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn hash_variant(locale: Locale, query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    locale.hash(&mut hasher);
    query.hash(&mut hasher);
    hasher.finish()
}
