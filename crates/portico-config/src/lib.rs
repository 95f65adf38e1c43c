//! Typed configuration for Portico applications.
//!
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`PorticoConfig`] holds every section: [`AppConfig`], [`ServerConfig`],
//! [`SessionConfig`], [`AuthConfig`], [`ViewConfig`], [`LoggingConfig`],
//! [`MetricsConfig`], [`MiddlewareConfig`] and the [`RouteConfig`] table.
//!
//! # Example
//!
//! ```no_run
//! use portico_config::ConfigLoader;
//!
//! # fn main() -> Result<(), portico_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("config/portico.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("PORTICO")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [app]
//! name = "Portico Demo"
//! debug = true
//!
//! [session]
//! cookie_name = "portico_session"
//! lifetime_secs = 7200
//!
//! [middleware.groups]
//! web = ["start_session"]
//! admin = ["web", "auth", "role:admin"]
//!
//! [[routes]]
//! path = "/admin"
//! controller = "admin"
//! action = "index"
//! method = "GET"
//! middleware = ["admin"]
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `PORTICO__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `PORTICO__APP__DEBUG=true`
//! - `PORTICO__MIDDLEWARE__GLOBAL=request_id,security_headers`

#![doc(html_root_url = "https://docs.rs/portico-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
