//! Store traits describing the listing data adapter.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::property::{Property, PropertyCard, PropertyCategory};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store response could not be decoded: {0}")]
    Decode(String),
    #[error("store misconfigured: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub category: Option<PropertyCategory>,
    /// Free text matched against title, municipality and location label.
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
}

impl PropertyFilter {
    pub fn category(category: PropertyCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }
}

/// Who is viewing a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated { access_token: String },
}

/// A view as handed to the store's dedup procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyView {
    pub property_id: String,
    pub session_id: Option<String>,
    pub viewer: Viewer,
}

#[async_trait]
pub trait PropertiesRepo: Send + Sync {
    async fn find_property(&self, id: &str) -> Result<Option<Property>, StoreError>;

    /// Newest first.
    async fn list_properties(
        &self,
        filter: &PropertyFilter,
        page: PageRequest,
    ) -> Result<Page<PropertyCard>, StoreError>;
}

#[async_trait]
pub trait CardViewRepo: Send + Sync {
    /// Rebuild the denormalised card view. Requires privileged credentials.
    async fn refresh_card_view(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PropertyViewsRepo: Send + Sync {
    async fn record_view(&self, view: PropertyView) -> Result<(), StoreError>;
}
