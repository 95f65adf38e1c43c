//! Logging and metrics for Portico applications.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_config::ConfigLoader;
//! use portico_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().with_file("config/portico.toml")?.load()?;
//!     init_telemetry(&TelemetryConfig::from_config(&config))?;
//!     tracing::info!("telemetry ready");
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/portico-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{
    init_metrics, record_error, record_login, record_request, render_metrics, InFlightGuard,
    MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
