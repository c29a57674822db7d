//! Process-wide log and trace output.

use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::TelemetryError;

/// Installs the global tracing subscriber and routes `log` records into it.
///
/// `RUST_LOG` overrides `logging.level` when set. Can only succeed once
/// per process.
pub fn init(logging: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&logging.level)?,
    };

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| TelemetryError::LogBridge(e.to_string()))?;

    tracing::debug!("Telemetry initialised ({:?} format)", logging.format);
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level).map_err(|_| TelemetryError::InvalidLevel(level.to_string()))
}
