//! In-memory store and router wiring shared by the integration tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use time::macros::datetime;
use tower::ServiceExt;

use javea::application::{
    listing::ListingService,
    metadata::SiteIdentity,
    pagination::{Page, PageRequest},
    repos::{
        CardViewRepo, PropertiesRepo, PropertyFilter, PropertyView, PropertyViewsRepo, StoreError,
    },
    revalidation::RevalidationService,
    tracking::ViewTrackingService,
};
use javea::cache::{CacheConfig, ResponseCache};
use javea::domain::property::{Location, Property, PropertyCard, PropertyCategory, PropertySpecs};
use javea::infra::http::{HttpState, build_router};

pub const SECRET: &str = "upload-pipeline-secret";

#[derive(Default)]
pub struct FakeStore {
    pub properties: Mutex<Vec<Property>>,
    pub fail_reads: Mutex<bool>,
    pub fail_refresh: Mutex<bool>,
    pub fail_views: Mutex<bool>,
    pub reads: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub views: Mutex<Vec<PropertyView>>,
}

impl FakeStore {
    pub fn with_property(property: Property) -> Self {
        let store = Self::default();
        store.properties.lock().expect("lock").push(property);
        store
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn rename(&self, id: &str, title: &str) {
        for property in self.properties.lock().expect("lock").iter_mut() {
            if property.id == id {
                property.title = title.to_string();
                property.title_en = Some(title.to_string());
            }
        }
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.lock().expect("lock") {
            return Err(StoreError::transport("store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl PropertiesRepo for FakeStore {
    async fn find_property(&self, id: &str) -> Result<Option<Property>, StoreError> {
        self.check_reads()?;
        Ok(self
            .properties
            .lock()
            .expect("lock")
            .iter()
            .find(|property| property.id == id)
            .cloned())
    }

    async fn list_properties(
        &self,
        filter: &PropertyFilter,
        page: PageRequest,
    ) -> Result<Page<PropertyCard>, StoreError> {
        self.check_reads()?;
        let cards: Vec<PropertyCard> = self
            .properties
            .lock()
            .expect("lock")
            .iter()
            .filter(|property| {
                filter
                    .category
                    .is_none_or(|category| property.category.listed_under() == category)
            })
            .map(card)
            .collect();
        let total = cards.len() as u64;
        Ok(Page::new(cards, page, total))
    }
}

#[async_trait]
impl CardViewRepo for FakeStore {
    async fn refresh_card_view(&self) -> Result<(), StoreError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if *self.fail_refresh.lock().expect("lock") {
            return Err(StoreError::Status {
                status: 500,
                body: "refresh failed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyViewsRepo for FakeStore {
    async fn record_view(&self, view: PropertyView) -> Result<(), StoreError> {
        if *self.fail_views.lock().expect("lock") {
            return Err(StoreError::transport("store offline"));
        }
        self.views.lock().expect("lock").push(view);
        Ok(())
    }
}

pub fn property(id: &str, title: &str, category: PropertyCategory) -> Property {
    Property {
        id: id.to_string(),
        category,
        title: title.to_string(),
        title_en: Some(title.to_string()),
        title_ru: None,
        description: Some("Luminosa villa con vistas al mar.".to_string()),
        description_en: Some("Bright villa with sea views.".to_string()),
        description_ru: None,
        price: 350_000.0,
        location: Location {
            municipality: Some("Jávea".to_string()),
            ..Location::default()
        },
        images: vec!["https://img.example/1.jpg".to_string()],
        features: vec!["pool".to_string()],
        specs: PropertySpecs {
            bedrooms: Some(3),
            ..PropertySpecs::default()
        },
        views_count: 0,
        saves_count: 0,
        created_at: datetime!(2025-06-01 10:00 UTC),
    }
}

fn card(property: &Property) -> PropertyCard {
    PropertyCard {
        id: property.id.clone(),
        category: property.category,
        title: property.title.clone(),
        title_en: property.title_en.clone(),
        title_ru: property.title_ru.clone(),
        price: property.price,
        municipality: property.location.municipality.clone(),
        location: property.location.label.clone(),
        primary_image: property.images.first().cloned(),
        bedrooms: property.specs.bedrooms,
        bathrooms: property.specs.bathrooms,
        size: property.specs.size,
        views_count: property.views_count,
        created_at: property.created_at,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<FakeStore>,
    pub cache: Arc<ResponseCache>,
}

pub fn app(store: FakeStore, secret: Option<&str>) -> TestApp {
    let store = Arc::new(store);
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
    let site = SiteIdentity::new(
        "https://javea.example",
        "Jávea Estates",
        "Homes in Jávea",
    );

    let state = HttpState {
        listings: Arc::new(ListingService::new(store.clone(), site, 12)),
        revalidation: Arc::new(RevalidationService::new(
            secret.map(str::to_string),
            cache.clone(),
            store.clone(),
            Duration::from_millis(500),
        )),
        tracking: Arc::new(ViewTrackingService::new(store.clone())),
        cache: cache.clone(),
    };

    TestApp {
        router: build_router(state),
        store,
        cache,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (Response<Body>, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.expect("body").to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (Response::from_parts(parts, Body::empty()), json)
    }

    pub async fn get(&self, path: &str) -> (Response<Body>, serde_json::Value) {
        self.send(
            Request::get(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn post_json(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (Response<Body>, serde_json::Value) {
        let mut builder = Request::post(path).header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn revalidate(&self, body: &str) -> (Response<Body>, serde_json::Value) {
        self.post_json(
            "/api/revalidate",
            &[("x-revalidate-secret", SECRET)],
            body,
        )
        .await
    }
}
