//! Post-upload cache revalidation.
//!
//! After the upload pipeline writes new property data it calls the
//! revalidation endpoint, which lands here. The coordinator drops every
//! affected cache entry and asks the store to rebuild the card view. Apart
//! from authorization, each step is best-effort: a failing step is logged and
//! left out of the result instead of failing the whole request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::application::repos::CardViewRepo;
use crate::cache::{CacheError, PROPERTIES_TAG};

const ALL_PROPERTIES_LOG_ENTRY: &str = "tag:properties (all property data)";

/// Listing pages that are swept on every revalidation, in order.
pub const CATEGORY_SWEEP: [&str; 5] = ["/", "/sale", "/rent", "/new-building", "/search"];

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

const METRIC_REVALIDATE_TOTAL: &str = "javea_revalidate_total";
const METRIC_REVALIDATE_UNAUTHORIZED: &str = "javea_revalidate_unauthorized_total";
const METRIC_REFRESH_FAILED: &str = "javea_card_view_refresh_failed_total";
const METRIC_REFRESH_MS: &str = "javea_card_view_refresh_ms";

/// Cache layer as seen by the coordinator.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Drop every entry tagged `tag`, returning how many were dropped.
    async fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError>;

    /// Drop every variant of the page at `path`.
    async fn invalidate_path(&self, path: &str) -> Result<usize, CacheError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevalidationRequest {
    pub tags: Option<Vec<String>>,
    pub paths: Option<Vec<String>>,
    pub clear_all: bool,
}

impl RevalidationRequest {
    /// Whether the catch-all `properties` tag must be invalidated.
    ///
    /// An explicitly empty list still counts as a targeted request.
    fn wants_full_invalidation(&self) -> bool {
        self.clear_all || (self.tags.is_none() && self.paths.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationOutcome {
    /// `tag:<name>` and `path:<path>` entries in execution order.
    pub revalidated: Vec<String>,
    pub view_refreshed: bool,
    pub completed_at: OffsetDateTime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevalidationError {
    #[error("revalidation secret missing or invalid")]
    Unauthorized,
}

pub struct RevalidationService {
    secret: Option<String>,
    cache: Arc<dyn CacheInvalidator>,
    card_view: Arc<dyn CardViewRepo>,
    refresh_timeout: Duration,
}

impl RevalidationService {
    /// `secret = None` rejects every caller.
    pub fn new(
        secret: Option<String>,
        cache: Arc<dyn CacheInvalidator>,
        card_view: Arc<dyn CardViewRepo>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            secret: secret.filter(|value| !value.is_empty()),
            cache,
            card_view,
            refresh_timeout,
        }
    }

    pub async fn revalidate(
        &self,
        presented_secret: Option<&str>,
        request: RevalidationRequest,
    ) -> Result<RevalidationOutcome, RevalidationError> {
        if !self.authorize(presented_secret) {
            counter!(METRIC_REVALIDATE_UNAUTHORIZED).increment(1);
            warn!(
                target = "application::revalidation",
                secret_present = presented_secret.is_some(),
                "Rejected revalidation request"
            );
            return Err(RevalidationError::Unauthorized);
        }

        let mut revalidated = Vec::new();

        for tag in request.tags.iter().flatten() {
            if self.invalidate_tag(tag).await {
                revalidated.push(format!("tag:{tag}"));
            }
        }

        for path in request.paths.iter().flatten() {
            if self.invalidate_path(path).await {
                revalidated.push(format!("path:{path}"));
            }
        }

        if request.wants_full_invalidation() && self.invalidate_tag(PROPERTIES_TAG).await {
            revalidated.push(ALL_PROPERTIES_LOG_ENTRY.to_string());
        }

        for path in CATEGORY_SWEEP {
            if self.invalidate_path(path).await {
                revalidated.push(format!("path:{path}"));
            }
        }

        let view_refreshed = self.refresh_card_view().await;

        counter!(METRIC_REVALIDATE_TOTAL).increment(1);
        info!(
            target = "application::revalidation",
            entries = revalidated.len(),
            view_refreshed,
            "Cache revalidated"
        );

        Ok(RevalidationOutcome {
            revalidated,
            view_refreshed,
            completed_at: OffsetDateTime::now_utc(),
        })
    }

    fn authorize(&self, presented: Option<&str>) -> bool {
        match (self.secret.as_deref(), presented) {
            (Some(expected), Some(given)) => expected.as_bytes().ct_eq(given.as_bytes()).into(),
            _ => false,
        }
    }

    async fn invalidate_tag(&self, tag: &str) -> bool {
        match self.cache.invalidate_tag(tag).await {
            Ok(dropped) => {
                debug!(tag, dropped, "Invalidated cache tag");
                true
            }
            Err(err) => {
                warn!(
                    target = "application::revalidation",
                    tag,
                    error = %err,
                    "Failed to invalidate cache tag"
                );
                false
            }
        }
    }

    async fn invalidate_path(&self, path: &str) -> bool {
        match self.cache.invalidate_path(path).await {
            Ok(dropped) => {
                debug!(path, dropped, "Invalidated cache path");
                true
            }
            Err(err) => {
                warn!(
                    target = "application::revalidation",
                    path,
                    error = %err,
                    "Failed to invalidate cache path"
                );
                false
            }
        }
    }

    /// Run the refresh in its own task so a panic or a hung store call
    /// cannot take the request down with it.
    async fn refresh_card_view(&self) -> bool {
        let started_at = Instant::now();
        let repo = Arc::clone(&self.card_view);
        let mut task = tokio::spawn(async move { repo.refresh_card_view().await });

        let refreshed = match tokio::time::timeout(self.refresh_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(err))) => {
                warn!(
                    target = "application::revalidation",
                    error = %err,
                    "Card view refresh failed"
                );
                false
            }
            Ok(Err(join_err)) => {
                error!(
                    target = "application::revalidation",
                    panicked = join_err.is_panic(),
                    error = %join_err,
                    "Card view refresh task aborted"
                );
                false
            }
            Err(_) => {
                task.abort();
                warn!(
                    target = "application::revalidation",
                    timeout_ms = self.refresh_timeout.as_millis() as u64,
                    "Card view refresh timed out"
                );
                false
            }
        };

        histogram!(METRIC_REFRESH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        if !refreshed {
            counter!(METRIC_REFRESH_FAILED).increment(1);
        }
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::application::repos::StoreError;

    #[derive(Default)]
    struct RecordingCache {
        calls: Mutex<Vec<String>>,
        failing_tags: HashSet<String>,
    }

    impl RecordingCache {
        fn failing(tags: &[&str]) -> Self {
            Self {
                failing_tags: tags.iter().map(|tag| tag.to_string()).collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl CacheInvalidator for RecordingCache {
        async fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError> {
            self.calls.lock().expect("calls lock").push(format!("tag:{tag}"));
            if self.failing_tags.contains(tag) {
                return Err(CacheError::InvalidTag);
            }
            Ok(1)
        }

        async fn invalidate_path(&self, path: &str) -> Result<usize, CacheError> {
            self.calls.lock().expect("calls lock").push(format!("path:{path}"));
            if !path.starts_with('/') {
                return Err(CacheError::InvalidPath(path.to_string()));
            }
            Ok(1)
        }
    }

    enum RefreshMode {
        Succeed,
        Fail,
        Hang,
        Panic,
    }

    struct FakeCardView {
        mode: RefreshMode,
        calls: AtomicUsize,
    }

    impl FakeCardView {
        fn new(mode: RefreshMode) -> Self {
            Self {
                mode,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CardViewRepo for FakeCardView {
        async fn refresh_card_view(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                RefreshMode::Succeed => Ok(()),
                RefreshMode::Fail => Err(StoreError::Status {
                    status: 500,
                    body: "refresh failed".to_string(),
                }),
                RefreshMode::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                }
                RefreshMode::Panic => panic!("refresh exploded"),
            }
        }
    }

    fn service(
        cache: Arc<RecordingCache>,
        card_view: Arc<FakeCardView>,
    ) -> RevalidationService {
        RevalidationService::new(
            Some("s3cret".to_string()),
            cache,
            card_view,
            Duration::from_millis(100),
        )
    }

    fn sweep_entries() -> Vec<String> {
        CATEGORY_SWEEP.iter().map(|path| format!("path:{path}")).collect()
    }

    #[tokio::test]
    async fn wrong_secret_has_no_side_effects() {
        let cache = Arc::new(RecordingCache::default());
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let service = service(cache.clone(), card_view.clone());

        for presented in [None, Some("nope"), Some("")] {
            let result = service
                .revalidate(presented, RevalidationRequest::default())
                .await;
            assert_eq!(result, Err(RevalidationError::Unauthorized));
        }
        assert!(cache.calls().is_empty());
        assert_eq!(card_view.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconfigured_secret_rejects_everyone() {
        let cache = Arc::new(RecordingCache::default());
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let service = RevalidationService::new(
            Some(String::new()),
            cache.clone(),
            card_view,
            DEFAULT_REFRESH_TIMEOUT,
        );

        let result = service
            .revalidate(Some(""), RevalidationRequest::default())
            .await;
        assert_eq!(result, Err(RevalidationError::Unauthorized));
        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_request_invalidates_everything() {
        let cache = Arc::new(RecordingCache::default());
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let outcome = service(cache, card_view)
            .revalidate(Some("s3cret"), RevalidationRequest::default())
            .await
            .expect("authorized");

        let mut expected = vec![ALL_PROPERTIES_LOG_ENTRY.to_string()];
        expected.extend(sweep_entries());
        assert_eq!(outcome.revalidated, expected);
        assert!(outcome.view_refreshed);
    }

    #[tokio::test]
    async fn targeted_request_keeps_order_and_skips_default_tag() {
        let cache = Arc::new(RecordingCache::default());
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let request = RevalidationRequest {
            tags: Some(vec!["property:42".to_string()]),
            paths: Some(vec!["/property/villa-42".to_string()]),
            clear_all: false,
        };
        let outcome = service(cache, card_view)
            .revalidate(Some("s3cret"), request)
            .await
            .expect("authorized");

        let mut expected = vec![
            "tag:property:42".to_string(),
            "path:/property/villa-42".to_string(),
        ];
        expected.extend(sweep_entries());
        assert_eq!(outcome.revalidated, expected);
    }

    #[tokio::test]
    async fn explicitly_empty_lists_skip_default_tag() {
        let cache = Arc::new(RecordingCache::default());
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let request = RevalidationRequest {
            tags: Some(Vec::new()),
            paths: None,
            clear_all: false,
        };
        let outcome = service(cache, card_view)
            .revalidate(Some("s3cret"), request)
            .await
            .expect("authorized");

        assert_eq!(outcome.revalidated, sweep_entries());
    }

    #[tokio::test]
    async fn clear_all_adds_default_tag_after_requested_ones() {
        let cache = Arc::new(RecordingCache::default());
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let request = RevalidationRequest {
            tags: Some(vec!["category:rent".to_string()]),
            paths: None,
            clear_all: true,
        };
        let outcome = service(cache.clone(), card_view)
            .revalidate(Some("s3cret"), request)
            .await
            .expect("authorized");

        assert_eq!(outcome.revalidated[0], "tag:category:rent");
        assert_eq!(outcome.revalidated[1], ALL_PROPERTIES_LOG_ENTRY);
        assert_eq!(cache.calls()[1], "tag:properties");
    }

    #[tokio::test]
    async fn failed_steps_are_omitted_but_request_succeeds() {
        let cache = Arc::new(RecordingCache::failing(&["broken"]));
        let card_view = Arc::new(FakeCardView::new(RefreshMode::Succeed));
        let request = RevalidationRequest {
            tags: Some(vec!["broken".to_string(), "ok".to_string()]),
            paths: Some(vec!["no-leading-slash".to_string()]),
            clear_all: false,
        };
        let outcome = service(cache.clone(), card_view)
            .revalidate(Some("s3cret"), request)
            .await
            .expect("authorized");

        assert_eq!(outcome.revalidated[0], "tag:ok");
        assert!(!outcome.revalidated.iter().any(|entry| entry.contains("broken")));
        assert!(
            !outcome
                .revalidated
                .iter()
                .any(|entry| entry.contains("no-leading-slash"))
        );
        assert!(cache.calls().contains(&"tag:broken".to_string()));
    }

    #[tokio::test]
    async fn refresh_failure_is_not_fatal() {
        for mode in [RefreshMode::Fail, RefreshMode::Panic, RefreshMode::Hang] {
            let cache = Arc::new(RecordingCache::default());
            let card_view = Arc::new(FakeCardView::new(mode));
            let outcome = service(cache, card_view.clone())
                .revalidate(Some("s3cret"), RevalidationRequest::default())
                .await
                .expect("authorized");

            assert!(!outcome.view_refreshed);
            assert_eq!(outcome.revalidated.len(), 1 + CATEGORY_SWEEP.len());
            assert_eq!(card_view.calls.load(Ordering::SeqCst), 1);
        }
    }
}
