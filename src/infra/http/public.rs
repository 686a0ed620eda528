//! Public page documents, served as JSON for the site renderer.
//!
//! Every route exists once per locale: unprefixed for English, under `/es`
//! and `/ru` otherwise.

use std::{convert::Infallible, str::FromStr};

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        listing::PropertyLookup,
        metadata::PageMetadata,
        repos::PropertyFilter,
    },
    domain::{locale::Locale, property::PropertyCategory},
};

use super::HttpState;

const SOURCE: &str = "infra::http::public";

pub(super) fn page_routes() -> Router<HttpState> {
    let mut router = Router::new();
    for locale in Locale::ALL {
        router = router
            .route(&locale.localize_path("/"), get(home))
            .route(&locale.localize_path("/search"), get(search))
            .route(&locale.localize_path("/property/{slug}"), get(property));

        for category in PropertyCategory::LISTED {
            router = router.route(
                &locale.localize_path(category.listing_path()),
                get(
                    move |state: State<HttpState>, locale: PageLocale, query: Query<PageQuery>| {
                        category_index(state, locale, query, category)
                    },
                ),
            );
        }
    }
    router
}

/// Locale taken from the path prefix of the request.
#[derive(Debug, Clone, Copy)]
struct PageLocale(Locale);

impl<S: Send + Sync> FromRequestParts<S> for PageLocale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Locale::split_path(parts.uri.path()).0))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    page: Option<u32>,
    q: Option<String>,
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    bedrooms: Option<u32>,
}

impl SearchQuery {
    fn filter(&self) -> Result<PropertyFilter, HttpError> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(PropertyCategory::from_str(value).map_err(|err| {
                HttpError::from_error(
                    "infra::http::public::search",
                    StatusCode::BAD_REQUEST,
                    "Unknown category",
                    &err,
                )
            })?),
        };

        Ok(PropertyFilter {
            category,
            search: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_string),
            min_price: self.min_price,
            max_price: self.max_price,
            min_bedrooms: self.bedrooms,
        })
    }
}

#[derive(Debug, Serialize)]
struct MissingPropertyBody {
    error: &'static str,
    metadata: PageMetadata,
}

async fn home(State(state): State<HttpState>, PageLocale(locale): PageLocale) -> Response {
    match state.listings.home(locale).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn category_index(
    State(state): State<HttpState>,
    PageLocale(locale): PageLocale,
    Query(query): Query<PageQuery>,
    category: PropertyCategory,
) -> Response {
    let page = query.page.unwrap_or(1);
    match state.listings.category(category, page, locale).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn search(
    State(state): State<HttpState>,
    PageLocale(locale): PageLocale,
    Query(query): Query<SearchQuery>,
) -> Result<Response, HttpError> {
    let filter = query.filter()?;
    let page = state
        .listings
        .search(&filter, query.page.unwrap_or(1), locale)
        .await?;
    Ok(Json(page).into_response())
}

async fn property(
    State(state): State<HttpState>,
    PageLocale(locale): PageLocale,
    Path(slug): Path<String>,
) -> Response {
    match state.listings.property(&slug, locale).await {
        PropertyLookup::Found(page) => Json(page).into_response(),
        PropertyLookup::NotFound(metadata) => missing_property(
            StatusCode::NOT_FOUND,
            "Property not found",
            metadata,
            format!("no property for slug `{slug}`"),
        ),
        PropertyLookup::Unavailable(metadata) => missing_property(
            StatusCode::SERVICE_UNAVAILABLE,
            "Listings temporarily unavailable",
            metadata,
            format!("property store unavailable for slug `{slug}`"),
        ),
    }
}

fn missing_property(
    status: StatusCode,
    error: &'static str,
    metadata: PageMetadata,
    detail: String,
) -> Response {
    let mut response = (status, Json(MissingPropertyBody { error, metadata })).into_response();
    ErrorReport::from_message("infra::http::public::property", status, detail)
        .attach(&mut response);
    response
}

pub(super) async fn not_found() -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::NOT_FOUND,
        "Not found",
        "no route matched the request",
    )
}
