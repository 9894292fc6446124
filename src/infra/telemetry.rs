use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
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
            "qanda_question_cache_hit_total",
            Unit::Count,
            "Total number of question cache hits."
        );
        describe_counter!(
            "qanda_question_cache_miss_total",
            Unit::Count,
            "Total number of question cache misses, expired entries included."
        );
        describe_counter!(
            "qanda_question_cache_expired_total",
            Unit::Count,
            "Total number of entries dropped after their freshness window."
        );
        describe_counter!(
            "qanda_question_cache_evict_total",
            Unit::Count,
            "Total number of question cache evictions due to capacity."
        );
        describe_counter!(
            "qanda_question_cache_stale_populate_total",
            Unit::Count,
            "Total number of populations refused because the question changed during the load."
        );
        describe_gauge!(
            "qanda_question_cache_entries",
            Unit::Count,
            "Current number of cached questions."
        );
        describe_counter!(
            "qanda_question_invalidation_total",
            Unit::Count,
            "Total number of question invalidations, labelled by change kind."
        );
        describe_counter!(
            "qanda_notification_publish_failed_total",
            Unit::Count,
            "Total number of question notices that could not be published."
        );
    });
}
