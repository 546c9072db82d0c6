//! Provides utilities to initialize logging and OpenTelemetry tracing.

use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the OTLP collector endpoint. Traces are only exported when set.
pub const OTLP_URL_ENVVAR: &str = "PLASMA_OTLP_URL";

/// Environment variable holding the service label, which is appended to the whoami string.
pub const SVC_LABEL_ENVVAR: &str = "PLASMA_SVC_LABEL";

/// Environment variable that, when set to `1`, adds the source file to every log line.
pub const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Environment variable that, when set to `1`, adds the line number to every log line.
pub const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// Name of the tracer that spans are exported under.
const TRACER_NAME: &str = "plasma-exits";

/// Errors while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The OTLP exporter could not be built.
    #[error("could not build the OTLP exporter: {0}")]
    Exporter(String),

    /// A global subscriber is already installed.
    #[error("could not install the global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// The whoami string, which is used to identify the service in logs.
    whoami: String,

    /// The OpenTelemetry URL for exporting traces.
    otel_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a new instance with whoami set and no trace export.
    pub const fn new(whoami: String) -> Self {
        Self {
            whoami,
            otel_url: None,
        }
    }

    /// Creates a new instance with the whoami string derived from `base` and the service label.
    pub fn with_base_name(base: &str) -> Self {
        Self::new(get_whoami_string(base))
    }

    /// Creates a new instance from `base` and the standard environment variables.
    pub fn from_env(base: &str) -> Self {
        let mut config = Self::with_base_name(base);
        if let Some(url) = get_otlp_url_from_env() {
            config.set_otlp_url(url);
        }

        config
    }

    /// Sets the opentelemetry URL to the provided string.
    pub fn set_otlp_url(&mut self, url: String) {
        self.otel_url = Some(url);
    }

    /// The whoami string.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(plasma-exits)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Log lines are written to stdout, filtered by `RUST_LOG`.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let log_file = env_flag(LOG_FILE_ENVVAR);
    let log_line_num = env_flag(LOG_LINE_NUM_ENVVAR);

    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(log_file)
                .with_line_number(log_line_num),
        )
        .with_filter(EnvFilter::from_default_env());

    match &config.otel_url {
        Some(otel_url) => {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.whoami.clone()))
                .build();

            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(otel_url)
                .build()
                .map_err(|e| LoggingError::Exporter(e.to_string()))?;

            let tp = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let otel_sub = tracing_opentelemetry::layer().with_tracer(tp.tracer(TRACER_NAME));

            tracing_subscriber::registry()
                .with(stdout_sub)
                .with(otel_sub)
                .try_init()?;
        }
        None => tracing_subscriber::registry().with(stdout_sub).try_init()?,
    }

    info!(whoami = %config.whoami, otlp = config.otel_url.is_some(), "logging started");

    Ok(())
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| v == "1")
}

/// Gets the OTLP URL from the standard envvar.
pub fn get_otlp_url_from_env() -> Option<String> {
    env::var(OTLP_URL_ENVVAR).ok()
}

/// Gets the service label from the standard envvar, which should be included in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    format_whoami(base, get_service_label_from_env().as_deref())
}

fn format_whoami(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whoami_includes_label() {
        assert_eq!(format_whoami("exit-sim", None), "exit-sim");
        assert_eq!(format_whoami("exit-sim", Some("alice")), "exit-sim%alice");
    }

    #[test]
    fn test_config_without_otlp_url() {
        let mut config = LoggerConfig::new("exit-sim".to_string());
        assert_eq!(config.whoami(), "exit-sim");
        assert!(config.otel_url.is_none());

        config.set_otlp_url("http://localhost:4317".to_string());
        assert_eq!(config.otel_url.as_deref(), Some("http://localhost:4317"));
    }
}
