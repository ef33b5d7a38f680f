use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
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

/// Register descriptions for the pagination cache metrics. Safe to call repeatedly.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "bookapi_cache_hit_total",
            Unit::Count,
            "Listing pages served from the pagination cache."
        );
        describe_counter!(
            "bookapi_cache_miss_total",
            Unit::Count,
            "Listing pages that had to be computed from the store."
        );
        describe_counter!(
            "bookapi_cache_evict_total",
            Unit::Count,
            "Cached pages dropped to stay within capacity."
        );
        describe_counter!(
            "bookapi_cache_invalidated_total",
            Unit::Count,
            "Cached pages removed by tag invalidation, labelled by tag."
        );
        describe_counter!(
            "bookapi_cache_stale_fill_total",
            Unit::Count,
            "Computed pages not stored because a write invalidated their tag meanwhile."
        );
        describe_histogram!(
            "bookapi_cache_compute_ms",
            Unit::Milliseconds,
            "Time spent computing a listing page on a cache miss."
        );
        describe_gauge!(
            "bookapi_cache_entries",
            Unit::Count,
            "Current number of cached listing pages."
        );
    });
}
