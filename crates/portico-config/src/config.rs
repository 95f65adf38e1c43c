//! Main configuration types.
//!
//! This module provides the top-level [`PorticoConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{
    AppConfig, AuthConfig, ConfigError, LogFormat, LoggingConfig, MetricsConfig,
    MiddlewareConfig, RouteConfig, ServerConfig, SessionConfig, ViewConfig,
};

/// Complete Portico application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use portico_config::PorticoConfig;
///
/// let config = PorticoConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.auth.login_url, "/login");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PorticoConfig {
    /// Application settings.
    #[serde(default)]
    pub app: AppConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session cookie and storage.
    #[serde(default)]
    pub session: SessionConfig,

    /// Authentication redirects.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Templates.
    #[serde(default)]
    pub view: ViewConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Global list, groups and aliases.
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Route table, in match order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl PorticoConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::{PorticoConfig, RouteConfig};
    ///
    /// let config = PorticoConfig::builder()
    ///     .route(RouteConfig::new("GET", "/", "home", "index").with_middleware(["web"]))
    ///     .build();
    ///
    /// assert_eq!(config.routes.len(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> PorticoConfigBuilder {
        PorticoConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The server or an enabled metrics address is not a socket address
    /// - The body limit, session lifetime or sweep interval is zero, or the
    ///   cookie name is empty
    /// - A route has an empty path, controller or action, or a method that
    ///   is not an uppercase token
    /// - A middleware group or alias has an empty name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "session.cookie_name",
                "must not be empty",
            ));
        }

        for (field, value) in [
            ("server.max_body_bytes", self.server.max_body_bytes),
            ("session.lifetime_secs", self.session.lifetime_secs),
            ("session.sweep_interval_secs", self.session.sweep_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "must be greater than zero"));
            }
        }

        for (index, route) in self.routes.iter().enumerate() {
            if route.path.is_empty() || route.controller.is_empty() || route.action.is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("routes[{index}]"),
                    "path, controller and action are required",
                ));
            }
            if route.method.is_empty()
                || !route.method.bytes().all(|b| b.is_ascii_uppercase())
            {
                return Err(ConfigError::invalid_value(
                    format!("routes[{index}].method"),
                    format!("expected an uppercase HTTP method, got '{}'", route.method),
                ));
            }
        }

        let names = self
            .middleware
            .groups
            .keys()
            .chain(self.middleware.aliases.keys());
        for name in names {
            if name.trim().is_empty() || name.contains(':') {
                return Err(ConfigError::invalid_value(
                    "middleware",
                    format!("invalid group or alias name '{name}'"),
                ));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Debug error pages
    /// - Pretty log formatting at debug level
    /// - Bound to localhost
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::PorticoConfig;
    ///
    /// let config = PorticoConfig::development();
    /// assert!(config.app.debug);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.app.env = "development".to_string();
        config.app.debug = true;

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;

        config.server.http_addr = "127.0.0.1:8080".to_string();

        config
    }

    /// Create a production configuration preset.
    ///
    /// - Generic error pages
    /// - JSON logs at info level
    /// - Secure session cookies and forced HTTPS
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::PorticoConfig;
    ///
    /// let config = PorticoConfig::production();
    /// assert!(!config.app.debug);
    /// assert!(config.session.secure);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.app.env = "production".to_string();
        config.app.debug = false;
        config.app.force_https = true;

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;

        config.session.secure = true;

        config
    }

    /// Whether the application runs in a development environment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self.app.env.as_str(), "development" | "local")
    }
}

/// Builder for [`PorticoConfig`].
#[derive(Debug, Default)]
pub struct PorticoConfigBuilder {
    config: PorticoConfig,
}

impl PorticoConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.config.app = app;
        self
    }

    /// Set the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Set the session section.
    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Set the auth section.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    /// Set the view section.
    #[must_use]
    pub fn view(mut self, view: ViewConfig) -> Self {
        self.config.view = view;
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Set the metrics section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Set the middleware section.
    #[must_use]
    pub fn middleware(mut self, middleware: MiddlewareConfig) -> Self {
        self.config.middleware = middleware;
        self
    }

    /// Append a route.
    #[must_use]
    pub fn route(mut self, route: RouteConfig) -> Self {
        self.config.routes.push(route);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PorticoConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<PorticoConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PorticoConfig::default();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.auth.unauthorized_url, "/unauthorised");
        assert!(config.app.secure_headers);
        assert!(!config.metrics.enabled);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_builder_routes_keep_order() {
        let config = PorticoConfig::builder()
            .route(RouteConfig::new("GET", "/", "home", "index"))
            .route(RouteConfig::new("POST", "/login", "auth", "login"))
            .build();

        assert_eq!(config.routes[0].controller, "home");
        assert_eq!(config.routes[1].method, "POST");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(PorticoConfig::default().validate().is_ok());
        assert!(PorticoConfig::development().validate().is_ok());
        assert!(PorticoConfig::production().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let result = PorticoConfig::builder()
            .server(ServerConfig {
                http_addr: "not-an-address".to_string(),
                ..Default::default()
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("http_addr"));
    }

    #[test]
    fn test_validate_metrics_addr_only_when_enabled() {
        let disabled = PorticoConfig::builder()
            .metrics(MetricsConfig {
                enabled: false,
                addr: "invalid".to_string(),
            })
            .build();
        assert!(disabled.validate().is_ok());

        let enabled = PorticoConfig::builder()
            .metrics(MetricsConfig {
                enabled: true,
                addr: "invalid".to_string(),
            })
            .build();
        assert!(enabled.validate().unwrap_err().to_string().contains("metrics.addr"));
    }

    #[test]
    fn test_validate_lowercase_method() {
        let result = PorticoConfig::builder()
            .route(RouteConfig::new("get", "/", "home", "index"))
            .build_validated();
        assert!(result.unwrap_err().to_string().contains("routes[0].method"));
    }

    #[test]
    fn test_validate_zero_lifetime() {
        let result = PorticoConfig::builder()
            .session(SessionConfig {
                lifetime_secs: 0,
                ..Default::default()
            })
            .build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_body_limit() {
        let result = PorticoConfig::builder()
            .server(ServerConfig {
                http_addr: "127.0.0.1:8080".to_string(),
                max_body_bytes: 0,
                ..Default::default()
            })
            .build_validated();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("server.max_body_bytes"));
    }

    #[test]
    fn test_presets() {
        let dev = PorticoConfig::development();
        assert!(dev.is_development());
        assert_eq!(dev.logging.format, LogFormat::Pretty);

        let prod = PorticoConfig::production();
        assert!(!prod.is_development());
        assert!(prod.app.force_https);
        assert_eq!(prod.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
            [app]
            name = "Demo"
            debug = true

            [middleware.groups]
            web = ["start_session"]
            admin = ["web", "auth", "role:admin"]

            [[routes]]
            path = "/admin"
            controller = "admin"
            action = "index"
            middleware = ["admin"]
        "#;

        let config: PorticoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.app.name, "Demo");
        assert!(config.app.debug);
        let groups: Vec<_> = config.middleware.groups.keys().collect();
        assert_eq!(groups, vec!["web", "admin"]);
        assert_eq!(config.routes[0].middleware, vec!["admin"]);
        assert_eq!(config.middleware.global, vec!["request_id"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [server]
            http_addr = "127.0.0.1:8000"
            unknown_field = "value"
        "#;

        let result: Result<PorticoConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
