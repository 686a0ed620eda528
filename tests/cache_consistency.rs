//! Cached page documents and their invalidation through `/api/revalidate`.

mod support;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
};
use http_body_util::BodyExt;
use tokio::sync::Notify;
use tower::ServiceExt;

use javea::cache::{
    CACHE_STATUS_HEADER, CacheConfig, PROPERTIES_TAG, ResponseCache, deps, response_cache_layer,
};
use javea::domain::property::PropertyCategory;
use support::{FakeStore, SECRET, TestApp, app, property};

fn cache_status(response: &axum::http::Response<Body>) -> &str {
    response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

fn seeded() -> TestApp {
    app(
        FakeStore::with_property(property("1", "Villa Mar", PropertyCategory::Sale)),
        Some(SECRET),
    )
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let app = seeded();

    let (first, body) = app.get("/property/villa-mar-1").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_status(&first), "MISS");
    assert_eq!(body["property"]["title"], "Villa Mar");

    let (second, _) = app.get("/property/villa-mar-1").await;
    assert_eq!(cache_status(&second), "HIT");
    assert_eq!(app.store.reads(), 1);
}

#[tokio::test]
async fn tag_revalidation_regenerates_every_locale() {
    let app = seeded();
    app.get("/property/villa-mar-1").await;
    app.get("/es/property/villa-mar-1").await;
    app.store.rename("1", "Villa Sol");

    let (stale, body) = app.get("/property/villa-mar-1").await;
    assert_eq!(cache_status(&stale), "HIT");
    assert_eq!(body["property"]["title"], "Villa Mar");

    app.revalidate(r#"{"tags":["property:1"]}"#).await;

    for path in ["/property/villa-mar-1", "/es/property/villa-mar-1"] {
        let (fresh, body) = app.get(path).await;
        assert_eq!(cache_status(&fresh), "MISS", "{path}");
        assert_eq!(body["property"]["title"], "Villa Sol", "{path}");
    }
}

#[tokio::test]
async fn path_revalidation_drops_all_variants_of_the_page() {
    let app = seeded();
    app.get("/property/villa-mar-1").await;
    app.get("/ru/property/villa-mar-1").await;

    app.revalidate(r#"{"tags":[],"paths":["/property/villa-mar-1"]}"#)
        .await;

    let (en, _) = app.get("/property/villa-mar-1").await;
    let (ru, _) = app.get("/ru/property/villa-mar-1").await;
    assert_eq!(cache_status(&en), "MISS");
    assert_eq!(cache_status(&ru), "MISS");
}

#[tokio::test]
async fn localized_path_revalidation_drops_every_locale() {
    let app = seeded();
    app.get("/property/villa-mar-1").await;
    app.get("/es/property/villa-mar-1").await;
    app.store.rename("1", "Villa Sol");

    let (_, body) = app
        .revalidate(r#"{"paths":["/es/property/villa-mar-1"]}"#)
        .await;
    assert_eq!(body["revalidated"][0], "path:/es/property/villa-mar-1");

    for path in ["/property/villa-mar-1", "/es/property/villa-mar-1"] {
        let (fresh, body) = app.get(path).await;
        assert_eq!(cache_status(&fresh), "MISS", "{path}");
        assert_eq!(body["property"]["title"], "Villa Sol", "{path}");
    }
}

/// `/sale` renders the current data version, pausing until `release` fires.
fn gated_router(
    cache: Arc<ResponseCache>,
    version: Arc<AtomicUsize>,
    rendering: Arc<Notify>,
    release: Arc<Notify>,
) -> Router {
    Router::new()
        .route(
            "/sale",
            get(move || {
                let version = version.clone();
                let rendering = rendering.clone();
                let release = release.clone();
                async move {
                    deps::record(PROPERTIES_TAG);
                    let body = format!("v{}", version.load(Ordering::SeqCst));
                    rendering.notify_one();
                    release.notified().await;
                    body
                }
            }),
        )
        .layer(from_fn_with_state(cache, response_cache_layer))
}

async fn get_sale(router: Router) -> (String, String) {
    let response = router
        .oneshot(Request::get("/sale").body(Body::empty()).expect("request"))
        .await
        .expect("router is infallible");
    let status = cache_status(&response).to_string();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn render_overlapping_a_revalidation_is_not_cached() {
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
    let version = Arc::new(AtomicUsize::new(1));
    let rendering = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let router = gated_router(
        cache.clone(),
        version.clone(),
        rendering.clone(),
        release.clone(),
    );

    let in_flight = tokio::spawn(get_sale(router.clone()));
    rendering.notified().await;

    version.store(2, Ordering::SeqCst);
    assert_eq!(cache.invalidate_tag(PROPERTIES_TAG), Ok(0));
    assert_eq!(cache.invalidate_path("/sale"), Ok(0));
    release.notify_one();

    let (status, body) = in_flight.await.expect("request task");
    assert_eq!(status, "MISS");
    assert_eq!(body, "v1");
    assert!(cache.is_empty());

    release.notify_one();
    let (status, body) = get_sale(router.clone()).await;
    assert_eq!(status, "MISS");
    assert_eq!(body, "v2");

    let (status, body) = get_sale(router).await;
    assert_eq!(status, "HIT");
    assert_eq!(body, "v2");
}

#[tokio::test]
async fn category_pages_are_always_swept() {
    let app = seeded();
    app.get("/sale").await;
    app.get("/sale?page=2").await;

    app.revalidate(r#"{"tags":["unrelated"]}"#).await;

    let (first, _) = app.get("/sale").await;
    let (second, _) = app.get("/sale?page=2").await;
    assert_eq!(cache_status(&first), "MISS");
    assert_eq!(cache_status(&second), "MISS");
}

#[tokio::test]
async fn missing_property_is_a_404_with_fallback_metadata_and_not_cached() {
    let app = seeded();

    let (response, body) = app.get("/property/ghost-99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["metadata"]["title"], "Property Not Found");

    app.get("/property/ghost-99").await;
    assert_eq!(app.store.reads(), 2);
}

#[tokio::test]
async fn store_outage_is_unavailable_and_not_cached() {
    let app = seeded();
    *app.store.fail_reads.lock().expect("lock") = true;

    let (detail, body) = app.get("/property/villa-mar-1").await;
    assert_eq!(detail.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["metadata"]["title"], "Property Not Found");

    let (listing, _) = app.get("/rent").await;
    assert_eq!(listing.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn search_pages_are_noindex_and_reject_unknown_categories() {
    let app = seeded();

    let (response, body) = app.get("/search?q=villa&category=sale").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["metadata"]["noindex"], true);
    assert_eq!(body["results"]["total"], 1);

    let (response, _) = app.get("/search?category=castle").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_routes_bypass_the_cache_and_health_is_no_content() {
    let app = seeded();

    let (health, _) = app.get("/healthz").await;
    assert_eq!(health.status(), StatusCode::NO_CONTENT);
    assert_eq!(cache_status(&health), "");

    let (unknown, _) = app.get("/nowhere").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}
