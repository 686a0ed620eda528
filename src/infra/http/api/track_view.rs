//! `POST /api/track-view`
//!
//! Fire-and-forget from the property page, so failures never carry details.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use javea_api_types::{TrackViewRequest, TrackViewResponse};
use serde_json::Value;

use crate::application::{error::ErrorReport, repos::Viewer, tracking::TrackingError};
use crate::infra::http::HttpState;

const SOURCE: &str = "infra::http::api::track_view";

pub async fn track_view(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("malformed body: {err}"),
            );
        }
    };

    let request = match parse_request(payload) {
        Ok(request) => request,
        Err(err) => {
            return failure(StatusCode::BAD_REQUEST, format!("invalid body: {err}"));
        }
    };

    match state
        .tracking
        .track(
            &request.property_id,
            request.session_id,
            viewer_from_headers(&headers),
        )
        .await
    {
        Ok(()) => Json(TrackViewResponse { ok: true }).into_response(),
        Err(TrackingError::MissingPropertyId) => {
            failure(StatusCode::BAD_REQUEST, "propertyId is required")
        }
        Err(TrackingError::Store(err)) => {
            failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// A `sessionId` that is not a string is dropped rather than failing the view.
fn parse_request(mut payload: Value) -> Result<TrackViewRequest, serde_json::Error> {
    if let Some(fields) = payload.as_object_mut()
        && fields.get("sessionId").is_some_and(|value| !value.is_string())
    {
        fields.remove("sessionId");
    }
    serde_json::from_value(payload)
}

/// A bearer token marks the viewer as signed in; anything else is anonymous.
fn viewer_from_headers(headers: &HeaderMap) -> Viewer {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map_or(Viewer::Anonymous, |token| Viewer::Authenticated {
            access_token: token.to_string(),
        })
}

fn failure(status: StatusCode, detail: impl Into<String>) -> Response {
    let mut response = (status, Json(TrackViewResponse { ok: false })).into_response();
    ErrorReport::from_message(SOURCE, status, detail).attach(&mut response);
    response
}
