//! HTTP surface: public page documents plus the revalidation and tracking APIs.

pub mod api;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use javea_api_types::{HEALTH_PATH, REVALIDATE_PATH, TRACK_VIEW_PATH};

use crate::application::{
    listing::ListingService, revalidation::RevalidationService, tracking::ViewTrackingService,
};
use crate::cache::{ResponseCache, response_cache_layer};

pub use middleware::RequestContext;

#[derive(Clone)]
pub struct HttpState {
    pub listings: Arc<ListingService>,
    pub revalidation: Arc<RevalidationService>,
    pub tracking: Arc<ViewTrackingService>,
    pub cache: Arc<ResponseCache>,
}

pub fn build_router(state: HttpState) -> Router {
    // Page documents go through the response cache; the APIs never do.
    let pages = public::page_routes().layer(axum_middleware::from_fn_with_state(
        state.cache.clone(),
        response_cache_layer,
    ));

    let api = Router::new()
        .route(REVALIDATE_PATH, post(api::revalidate::revalidate))
        .route(TRACK_VIEW_PATH, post(api::track_view::track_view))
        .route(HEALTH_PATH, get(health));

    pages
        .merge(api)
        .fallback(public::not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
