use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "javea_revalidate_total",
            Unit::Count,
            "Total number of authorized revalidation requests."
        );
        describe_counter!(
            "javea_revalidate_unauthorized_total",
            Unit::Count,
            "Total number of revalidation requests rejected for a bad secret."
        );
        describe_counter!(
            "javea_card_view_refresh_failed_total",
            Unit::Count,
            "Total number of card view refreshes that failed, panicked or timed out."
        );
        describe_histogram!(
            "javea_card_view_refresh_ms",
            Unit::Milliseconds,
            "Card view refresh latency in milliseconds."
        );
        describe_counter!(
            "javea_cache_hit_total",
            Unit::Count,
            "Total number of response-cache hits."
        );
        describe_counter!(
            "javea_cache_miss_total",
            Unit::Count,
            "Total number of response-cache misses."
        );
        describe_counter!(
            "javea_cache_invalidated_total",
            Unit::Count,
            "Total number of cached responses dropped by revalidation."
        );
    });
}
