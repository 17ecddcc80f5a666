use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::thumbnails::{THUMBNAIL_CACHE_HIT, THUMBNAIL_CACHE_MISS};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::api::handlers::uploads::UPLOAD_SIZE_BYTES;
use crate::infra::http::api::middleware::ADMIN_AUTH_REJECTED;

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
            THUMBNAIL_CACHE_HIT,
            Unit::Count,
            "Thumbnail URL lookups served from the LRU."
        );
        describe_counter!(
            THUMBNAIL_CACHE_MISS,
            Unit::Count,
            "Thumbnail URL lookups that had to build the URL."
        );
        describe_counter!(
            ADMIN_AUTH_REJECTED,
            Unit::Count,
            "Admin requests refused for a missing or rejected session token."
        );
        describe_histogram!(
            UPLOAD_SIZE_BYTES,
            Unit::Bytes,
            "Size of stored thumbnail uploads."
        );
    });
}
