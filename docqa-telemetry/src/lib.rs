//! # docqa-telemetry
//!
//! Logging setup for docqa binaries.
//!
//! Logs go to stderr so they never interleave with answers printed on
//! stdout. The level is taken from `RUST_LOG` when set, otherwise from the
//! configured default.
//!
//! ```rust,ignore
//! docqa_telemetry::init_telemetry(&TelemetryConfig::new("docqa"))?;
//! tracing::info!("ready");
//! ```

pub mod capture;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt};

pub use capture::{CaptureLayer, CapturedEvents, EventData};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Settings for [`init_telemetry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Recorded on the startup log line.
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"info"`.
    pub default_filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Errors from [`init_telemetry`].
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    /// A global subscriber is already installed.
    #[error("telemetry already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Build the env filter: `RUST_LOG` wins, otherwise `default_filter`.
pub fn build_filter(default_filter: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| TelemetryError::InvalidFilter(e.to_string())),
    }
}

/// Install the global subscriber.
///
/// Calling this twice returns [`TelemetryError::AlreadyInitialized`]
/// instead of panicking.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(&config.default_filter)?;

    let fmt_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => {
            tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr).boxed()
        }
    };

    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        format = ?config.format,
        "telemetry initialized"
    );
    Ok(())
}

/// A subscriber that records every event into `storage`, for use with
/// [`tracing::subscriber::set_default`] in tests.
pub fn capture_subscriber(storage: CapturedEvents) -> impl tracing::Subscriber + Send + Sync {
    Registry::default().with(CaptureLayer::new(storage))
}
