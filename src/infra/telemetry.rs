use std::sync::Once;

use metrics::{Unit, describe_counter};
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
            "flashsale_cache_hit_total",
            Unit::Count,
            "Lookups answered from a live cache entry."
        );
        describe_counter!(
            "flashsale_cache_miss_total",
            Unit::Count,
            "Lookups that found no entry for the key."
        );
        describe_counter!(
            "flashsale_cache_null_hit_total",
            Unit::Count,
            "Lookups answered by a cached absence sentinel."
        );
        describe_counter!(
            "flashsale_cache_stale_total",
            Unit::Count,
            "Logical-expiry lookups that served a stale value."
        );
        describe_counter!(
            "flashsale_cache_rebuild_total",
            Unit::Count,
            "Background rebuilds that refreshed an entry."
        );
        describe_counter!(
            "flashsale_cache_rebuild_failed_total",
            Unit::Count,
            "Background rebuilds that failed or were rejected by the pool."
        );
        describe_counter!(
            "flashsale_lock_contended_total",
            Unit::Count,
            "Rebuild lock acquisitions lost to another holder."
        );
        describe_counter!(
            "flashsale_seckill_order_total",
            Unit::Count,
            "Voucher orders committed."
        );
        describe_counter!(
            "flashsale_seckill_rejected_total",
            Unit::Count,
            "Voucher purchase attempts rejected, labelled by reason."
        );
    });
}
