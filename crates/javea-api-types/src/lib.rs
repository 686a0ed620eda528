//! Wire shapes for the `/api/revalidate` and `/api/track-view` endpoints.
//!
//! Shared between the server and `javea-cli` so the upload pipeline and the
//! handlers can never drift apart on field names.

use serde::{Deserialize, Serialize};

/// Header carrying the pre-shared revalidation secret.
pub const REVALIDATE_SECRET_HEADER: &str = "x-revalidate-secret";
pub const REVALIDATE_PATH: &str = "/api/revalidate";
pub const TRACK_VIEW_PATH: &str = "/api/track-view";
pub const HEALTH_PATH: &str = "/healthz";

/// Body of `POST /api/revalidate`. Every field is optional; an empty body
/// means "invalidate everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_all: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidateResponse {
    pub success: bool,
    pub message: String,
    pub revalidated: Vec<String>,
    pub view_refreshed: bool,
    pub timestamp: String,
}

/// Error body used by the revalidation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body of `POST /api/track-view`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackViewRequest {
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackViewResponse {
    pub ok: bool,
}
