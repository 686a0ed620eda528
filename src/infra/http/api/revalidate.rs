//! `POST /api/revalidate`

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use javea_api_types::{ErrorBody, REVALIDATE_SECRET_HEADER, RevalidateRequest, RevalidateResponse};
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::application::{
    error::ErrorReport,
    revalidation::{RevalidationError, RevalidationRequest},
};
use crate::infra::http::HttpState;

const SOURCE: &str = "infra::http::api::revalidate";
const SUCCESS_MESSAGE: &str = "Cache revalidated successfully";

pub async fn revalidate(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let secret = headers
        .get(REVALIDATE_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let request = parse_request(&body);

    let outcome = match state.revalidation.revalidate(secret, request).await {
        Ok(outcome) => outcome,
        Err(RevalidationError::Unauthorized) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid revalidation secret",
                None,
            );
        }
    };

    match outcome.completed_at.format(&Rfc3339) {
        Ok(timestamp) => Json(RevalidateResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            revalidated: outcome.revalidated,
            view_refreshed: outcome.view_refreshed,
            timestamp,
        })
        .into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to revalidate cache",
            Some(err.to_string()),
        ),
    }
}

/// An empty or unparseable body is the same as `{}`: invalidate everything.
fn parse_request(body: &[u8]) -> RevalidationRequest {
    let wire = if body.iter().all(u8::is_ascii_whitespace) {
        RevalidateRequest::default()
    } else {
        serde_json::from_slice::<RevalidateRequest>(body).unwrap_or_else(|err| {
            warn!(
                target = SOURCE,
                error = %err,
                "Malformed revalidation body, treating it as empty"
            );
            RevalidateRequest::default()
        })
    };

    RevalidationRequest {
        tags: wire.tags,
        paths: wire.paths,
        clear_all: wire.clear_all.unwrap_or(false),
    }
}

fn error_response(status: StatusCode, error: &'static str, details: Option<String>) -> Response {
    let report = match &details {
        Some(details) => ErrorReport::from_message(SOURCE, status, details.clone()),
        None => ErrorReport::from_message(SOURCE, status, error),
    };
    let mut response = (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            details,
        }),
    )
        .into_response();
    report.attach(&mut response);
    response
}
