//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use indexmap::IndexMap;
use portico_core::cookie::SameSite;
use serde::{Deserialize, Serialize};

/// Application section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, shown in logs and default pages.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Deployment environment (e.g. "development", "production").
    #[serde(default = "default_env")]
    pub env: String,

    /// Render detailed error pages.
    #[serde(default)]
    pub debug: bool,

    /// Add the security headers middleware to the global list.
    #[serde(default = "default_true")]
    pub secure_headers: bool,

    /// Add the force-HTTPS middleware to the global list.
    #[serde(default)]
    pub force_https: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: default_env(),
            debug: false,
            secure_headers: true,
            force_https: false,
        }
    }
}

fn default_app_name() -> String {
    "Portico".to_string()
}

fn default_env() -> String {
    "production".to_string()
}

/// Server configuration section.
///
/// # Example
///
/// ```
/// use portico_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:8000".to_string(),
///     shutdown_timeout_secs: 10,
///     request_timeout_ms: 5000,
///     max_body_bytes: 64 * 1024,
/// };
/// assert_eq!(config.http_addr, "127.0.0.1:8000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest request body accepted, in bytes. Bigger bodies get a 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_max_body_bytes() -> u64 {
    2 * 1024 * 1024
}

/// Session cookie and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Idle lifetime of a session, in seconds.
    #[serde(default = "default_lifetime")]
    pub lifetime_secs: u64,

    /// How often the server drops expired sessions from the store, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Only send the cookie over HTTPS.
    #[serde(default)]
    pub secure: bool,

    /// Hide the cookie from scripts.
    #[serde(default = "default_true")]
    pub http_only: bool,

    /// `SameSite` attribute of the cookie.
    #[serde(default)]
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            lifetime_secs: default_lifetime(),
            sweep_interval_secs: default_sweep_interval(),
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

fn default_cookie_name() -> String {
    "portico_session".to_string()
}

fn default_lifetime() -> u64 {
    7200
}

fn default_sweep_interval() -> u64 {
    60
}

/// Authentication redirect targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Where guests are sent when a page needs a login.
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// The logout route.
    #[serde(default = "default_logout_url")]
    pub logout_url: String,

    /// Where logged-in users land after login, and where guest-only pages
    /// send them.
    #[serde(default = "default_redirect_after_login")]
    pub redirect_after_login: String,

    /// Where logged-in users without the required role or permission go.
    #[serde(default = "default_unauthorized_url")]
    pub unauthorized_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            logout_url: default_logout_url(),
            redirect_after_login: default_redirect_after_login(),
            unauthorized_url: default_unauthorized_url(),
        }
    }
}

fn default_login_url() -> String {
    "/login".to_string()
}

fn default_logout_url() -> String {
    "/logout".to_string()
}

fn default_redirect_after_login() -> String {
    "/dashboard".to_string()
}

fn default_unauthorized_url() -> String {
    "/unauthorised".to_string()
}

/// Template settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    /// Directory templates are loaded from.
    #[serde(default = "default_view_path")]
    pub path: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            path: default_view_path(),
        }
    }
}

fn default_view_path() -> String {
    "views".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production.
    #[default]
    Json,
    /// Human-readable format for development.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "portico=debug,hyper=warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus metrics endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Middleware lists, groups and aliases.
///
/// ```toml
/// [middleware]
/// global = ["request_id"]
///
/// [middleware.groups]
/// web = ["start_session"]
/// admin = ["web", "auth", "role:admin"]
///
/// [middleware.aliases]
/// auth = "authenticate"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MiddlewareConfig {
    /// Applied to every request, outermost first.
    #[serde(default = "default_global")]
    pub global: Vec<String>,

    /// Named groups, expanded in order.
    #[serde(default = "default_groups")]
    pub groups: IndexMap<String, Vec<String>>,

    /// Short names for middleware classes.
    #[serde(default = "default_aliases")]
    pub aliases: IndexMap<String, String>,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            global: default_global(),
            groups: default_groups(),
            aliases: default_aliases(),
        }
    }
}

fn default_global() -> Vec<String> {
    vec!["request_id".to_string()]
}

fn default_groups() -> IndexMap<String, Vec<String>> {
    IndexMap::from([("web".to_string(), vec!["start_session".to_string()])])
}

fn default_aliases() -> IndexMap<String, String> {
    [
        ("auth", "authenticate"),
        ("guest", "redirect_if_authenticated"),
        ("role", "require_role"),
        ("permission", "require_permission"),
        ("csrf", "verify_csrf"),
    ]
    .into_iter()
    .map(|(alias, class)| (alias.to_string(), class.to_string()))
    .collect()
}

/// A route record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Path pattern with `{name}` placeholders.
    pub path: String,

    /// Controller class name.
    pub controller: String,

    /// Action name.
    pub action: String,

    /// HTTP method, compared exactly.
    #[serde(default = "default_method")]
    pub method: String,

    /// Middleware references, outermost first.
    #[serde(default)]
    pub middleware: Vec<String>,
}

impl RouteConfig {
    /// A route record without middleware.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            controller: controller.into(),
            action: action.into(),
            method: method.into(),
            middleware: Vec::new(),
        }
    }

    /// Adds middleware references, builder style.
    pub fn with_middleware<I, S>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware.extend(middleware.into_iter().map(Into::into));
        self
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_true() -> bool {
    true
}
