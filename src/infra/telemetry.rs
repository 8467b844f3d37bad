//! Tracing and metrics bootstrap.
//!
//! Log output goes to stderr: stdout belongs to command output (rendered
//! markup, extracted text, feed listings) and must stay pipeable.

use std::{io, sync::Once};

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::Subscriber;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRICS_DESCRIBED: Once = Once::new();

/// Install the global tracing subscriber for this process.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(stderr_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("installing tracing subscriber: {err}")))
}

fn stderr_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
    }
}

fn describe_metrics() {
    METRICS_DESCRIBED.call_once(|| {
        describe_counter!(
            "pedium_store_requests_total",
            Unit::Count,
            "Total number of document store requests."
        );
        describe_histogram!(
            "pedium_store_request_ms",
            Unit::Milliseconds,
            "Document store request latency in milliseconds."
        );
        describe_counter!(
            "pedium_ai_requests_total",
            Unit::Count,
            "Total number of generative model calls."
        );
        describe_counter!(
            "pedium_upload_bytes_total",
            Unit::Bytes,
            "Total number of bytes uploaded to the image bucket."
        );
    });
}
