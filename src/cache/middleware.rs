//! Response cache middleware.
//!
//! Serves `GET` page responses from memory and stores successful ones along
//! with the tags recorded while they were built.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use crate::domain::locale::Locale;

use super::{
    ResponseCache, deps,
    keys::{ResponseKey, normalize_path},
    store::CachedResponse,
};

pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<Arc<ResponseCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    let Some(key) = cache_key(&request) else {
        return next.run(request).await;
    };

    if let Some(cached) = cache.lookup(&key) {
        debug!(cache = "response", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(
        cache = "response",
        outcome = "miss",
        "cache miss, executing handler"
    );

    let rendered_at = cache.generation();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let limit = cache.config().response_body_limit_bytes;
    if response
        .body()
        .size_hint()
        .upper()
        .is_none_or(|upper| upper > limit as u64)
    {
        debug!(cache = "response", limit, "response body too large to cache");
        return with_cache_status(response, "BYPASS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "response", error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    let tag_count = tags.len();
    if cache.insert(key, cached, tags, rendered_at) {
        debug!(cache = "response", tags = tag_count, "cached response");
    }

    with_cache_status(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

/// Key on the logical path so invalidating `/sale` also drops `/es/sale`.
fn cache_key(request: &Request<Body>) -> Option<ResponseKey> {
    let (locale, logical) = Locale::split_path(request.uri().path());
    let path = normalize_path(logical).ok()?;
    let query = request.uri().query().unwrap_or("");
    Some(ResponseKey::new(path, locale, query))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    let response = builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    with_cache_status(response, "HIT")
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn locale_prefix_is_folded_into_the_variant() {
        let en = cache_key(&request("/sale")).expect("key");
        let es = cache_key(&request("/es/sale")).expect("key");
        assert_eq!(en.path, "/sale");
        assert_eq!(es.path, "/sale");
        assert_ne!(en.variant, es.variant);
    }

    #[test]
    fn localized_root_maps_to_root() {
        let key = cache_key(&request("/ru")).expect("key");
        assert_eq!(key.path, "/");
    }

    #[test]
    fn query_distinguishes_variants() {
        let first = cache_key(&request("/sale?page=1")).expect("key");
        let second = cache_key(&request("/sale?page=2")).expect("key");
        assert_eq!(first.path, second.path);
        assert_ne!(first.variant, second.variant);
    }
}
