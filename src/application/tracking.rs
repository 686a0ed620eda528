//! Property view tracking.
//!
//! Deduplication is owned by the store procedure: authenticated viewers are
//! counted once per user per day, anonymous viewers once per session.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::application::repos::{PropertyView, PropertyViewsRepo, StoreError, Viewer};

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("property id is required")]
    MissingPropertyId,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ViewTrackingService {
    views: Arc<dyn PropertyViewsRepo>,
}

impl ViewTrackingService {
    pub fn new(views: Arc<dyn PropertyViewsRepo>) -> Self {
        Self { views }
    }

    pub async fn track(
        &self,
        property_id: &str,
        session_id: Option<String>,
        viewer: Viewer,
    ) -> Result<(), TrackingError> {
        let property_id = property_id.trim();
        if property_id.is_empty() {
            return Err(TrackingError::MissingPropertyId);
        }

        // The store keys authenticated views on the user, not the session.
        let session_id = match viewer {
            Viewer::Authenticated { .. } => None,
            Viewer::Anonymous => session_id.filter(|value| !value.trim().is_empty()),
        };
        let authenticated = matches!(viewer, Viewer::Authenticated { .. });

        let view = PropertyView {
            property_id: property_id.to_string(),
            session_id,
            viewer,
        };

        self.views.record_view(view).await.map_err(|err| {
            error!(
                target = "application::tracking",
                property_id,
                authenticated,
                error = %err,
                "Failed to record property view"
            );
            TrackingError::Store(err)
        })?;

        debug!(property_id, authenticated, "Recorded property view");
        Ok(())
    }
}
