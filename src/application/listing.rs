//! Page documents for the public listing routes.
//!
//! Every document records the cache tags of the data it was built from so
//! that revalidation can find it later.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::application::metadata::{
    ListingKind, PageMetadata, SiteIdentity, format_euros, listing_metadata, property_metadata,
};
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{PropertiesRepo, PropertyFilter, StoreError};
use crate::cache::{PROPERTIES_TAG, category_tag, deps, property_tag};
use crate::domain::{
    locale::Locale,
    property::{Property, PropertyCard, PropertyCategory},
    slug::id_from_slug,
};

pub const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A property card as shown on listing pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub url: String,
    pub title: String,
    pub category: PropertyCategory,
    pub price: f64,
    pub price_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

impl CardView {
    fn from_card(card: PropertyCard, locale: Locale) -> Self {
        let url = locale.localize_path(&format!("/property/{}", card.slug()));
        Self {
            title: card.localized_title(locale).to_string(),
            url,
            category: card.category,
            price: card.price,
            price_label: format!("€{}", format_euros(card.price)),
            location: card.municipality.or(card.location),
            image: card.primary_image,
            bedrooms: card.bedrooms,
            bathrooms: card.bathrooms,
            size: card.size,
            id: card.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub locale: Locale,
    pub metadata: PageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PropertyCategory>,
    pub results: Page<CardView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyPage {
    pub locale: Locale,
    pub metadata: PageMetadata,
    pub slug: String,
    pub listing_url: String,
    pub property: Property,
}

/// Outcome of a detail lookup. Only `Found` carries data; the other two
/// carry the not-found head so the page can still render.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyLookup {
    Found(Box<PropertyPage>),
    NotFound(PageMetadata),
    Unavailable(PageMetadata),
}

pub struct ListingService {
    properties: Arc<dyn PropertiesRepo>,
    site: SiteIdentity,
    page_size: u32,
}

impl ListingService {
    pub fn new(properties: Arc<dyn PropertiesRepo>, site: SiteIdentity, page_size: u32) -> Self {
        Self {
            properties,
            site,
            page_size,
        }
    }

    /// Newest listings across every category.
    pub async fn home(&self, locale: Locale) -> Result<ListingPage, ListingError> {
        self.listing(
            ListingKind::Home,
            &PropertyFilter::default(),
            1,
            locale,
        )
        .await
    }

    pub async fn category(
        &self,
        category: PropertyCategory,
        page: u32,
        locale: Locale,
    ) -> Result<ListingPage, ListingError> {
        let category = category.listed_under();
        deps::record(category_tag(category));
        self.listing(
            ListingKind::Category(category),
            &PropertyFilter::category(category),
            page,
            locale,
        )
        .await
    }

    pub async fn search(
        &self,
        filter: &PropertyFilter,
        page: u32,
        locale: Locale,
    ) -> Result<ListingPage, ListingError> {
        if let Some(category) = filter.category {
            deps::record(category_tag(category));
        }
        self.listing(ListingKind::Search, filter, page, locale).await
    }

    pub async fn property(&self, slug: &str, locale: Locale) -> PropertyLookup {
        deps::record(PROPERTIES_TAG);
        let fallback = || property_metadata(None, locale, &self.site);

        let Ok(id) = id_from_slug(slug) else {
            return PropertyLookup::NotFound(fallback());
        };
        deps::record(property_tag(id));

        match self.properties.find_property(id).await {
            Ok(Some(property)) => {
                let metadata = property_metadata(Some(&property), locale, &self.site);
                PropertyLookup::Found(Box::new(PropertyPage {
                    locale,
                    metadata,
                    slug: property.slug(),
                    listing_url: locale.localize_path(property.category.listing_path()),
                    property,
                }))
            }
            Ok(None) => PropertyLookup::NotFound(fallback()),
            Err(err) => {
                warn!(
                    target = "application::listing::property",
                    property_id = id,
                    error = %err,
                    "Property lookup failed"
                );
                PropertyLookup::Unavailable(fallback())
            }
        }
    }

    async fn listing(
        &self,
        kind: ListingKind,
        filter: &PropertyFilter,
        page: u32,
        locale: Locale,
    ) -> Result<ListingPage, ListingError> {
        deps::record(PROPERTIES_TAG);
        let request = PageRequest::new(page, self.page_size);
        let results = self.properties.list_properties(filter, request).await?;

        Ok(ListingPage {
            locale,
            metadata: listing_metadata(kind, locale, &self.site),
            category: match kind {
                ListingKind::Category(category) => Some(category),
                _ => None,
            },
            results: results.map(|card| CardView::from_card(card, locale)),
        })
    }
}
