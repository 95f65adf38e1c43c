//! Prometheus metrics for Portico.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `portico_requests_total` | Counter | `method`, `status` | Total requests |
//! | `portico_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `portico_in_flight_requests` | Gauge | - | In-flight requests |
//! | `portico_errors_total` | Counter | `kind` | Errors reaching the error handler |
//! | `portico_logins_total` | Counter | `outcome` | Login attempts |
//!
//! The recording functions are safe to call before [`init_metrics`]; without
//! an installed recorder they do nothing.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address the Prometheus exporter listens on.
    pub addr: String,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

impl From<&portico_config::MetricsConfig> for MetricsConfig {
    fn from(config: &portico_config::MetricsConfig) -> Self {
        Self {
            enabled: config.enabled,
            addr: config.addr.clone(),
            ..Self::default()
        }
    }
}

/// Initializes the metrics subsystem and spawns the exporter.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad listen address and
/// `TelemetryError::MetricsInit` when the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .build()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    let _ = METRICS_HANDLE.set(handle);

    tokio::spawn(async move {
        if let Err(err) = exporter.await {
            tracing::error!(error = ?err, "metrics exporter stopped");
        }
    });

    register_metric_descriptions();
    tracing::info!(addr = %addr, "metrics exporter listening");
    Ok(())
}

/// Renders metrics in Prometheus format, or `None` before [`init_metrics`].
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "portico_requests_total",
        "Total number of HTTP requests processed"
    );
    describe_histogram!(
        "portico_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "portico_in_flight_requests",
        "Number of HTTP requests currently being processed"
    );
    describe_counter!(
        "portico_errors_total",
        "Errors rendered by the error handler, by kind"
    );
    describe_counter!("portico_logins_total", "Login attempts by outcome");
}

/// Records a completed request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        "portico_requests_total",
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "portico_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records an error by its kind (e.g. `RouteNotFound`).
pub fn record_error(kind: &'static str) {
    counter!("portico_errors_total", "kind" => kind).increment(1);
}

/// Records a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("portico_logins_total", "outcome" => outcome).increment(1);
}

/// Guard that counts a request as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("portico_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("portico_in_flight_requests").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_from_metrics_section() {
        let section = portico_config::MetricsConfig {
            enabled: true,
            addr: "127.0.0.1:9191".to_string(),
        };
        let config = MetricsConfig::from(&section);
        assert!(config.enabled);
        assert_eq!(config.addr, "127.0.0.1:9191");
    }

    #[test]
    fn test_disabled_init_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_addr() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not an address".to_string(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_request("GET", 200, Duration::from_millis(10));
        record_error("RouteNotFound");
        record_login(false);
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
