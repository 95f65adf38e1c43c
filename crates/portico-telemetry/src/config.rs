//! Telemetry configuration.

use portico_config::PorticoConfig;

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Configuration for logging and metrics together.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Derives telemetry settings from the `logging` and `metrics` sections.
    #[must_use]
    pub fn from_config(config: &PorticoConfig) -> Self {
        Self {
            logging: LogConfig::from(&config.logging),
            metrics: MetricsConfig::from(&config.metrics),
        }
    }

    /// Replaces the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Replaces the metrics configuration.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_development_config() {
        let telemetry = TelemetryConfig::from_config(&PorticoConfig::development());
        assert!(!telemetry.logging.json_format);
        assert_eq!(telemetry.logging.level, "debug");
        assert!(!telemetry.metrics.enabled);
    }

    #[test]
    fn test_from_production_config() {
        let telemetry = TelemetryConfig::from_config(&PorticoConfig::production());
        assert!(telemetry.logging.json_format);
    }
}
