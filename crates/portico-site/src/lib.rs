//! # Portico Site
//!
//! A small members site built on Portico: a public home page, a login form
//! protected by CSRF tokens, a dashboard for logged-in users, an admin area
//! restricted to the `admin` role and a user directory behind the
//! `view_users` permission.
//!
//! Routes and middleware live in `config/portico.toml`; controllers, the
//! login history listener and the demo accounts are wired by
//! [`SiteProvider`].
//!
//! ```text
//! GET  /             HomeController@index         web
//! GET  /login        AuthController@login_form    web, guest
//! POST /login        AuthController@login         web, guest, csrf:login
//! GET  /dashboard    DashboardController@index    web, auth
//! GET  /admin        AdminController@index        admin (web, auth, role:admin)
//! GET  /users/{id}   UsersController@show         web, auth, permission:view_users
//! ```

#![doc(html_root_url = "https://docs.rs/portico-site/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod controllers;
pub mod listeners;
mod page;
mod provider;

use std::path::{Path, PathBuf};

use portico::config::{ConfigError, ConfigLoader, PorticoConfig};
use portico::server::Application;

pub use listeners::{LogUserLogin, LoginHistory, LoginRecord};
pub use page::Page;
pub use provider::{seed_users, SiteProvider, DEMO_ACCOUNTS};

/// Site version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory holding `config/` and `views/`.
pub const SITE_DIR: &str = env!("CARGO_MANIFEST_DIR");

/// The bundled configuration file.
#[must_use]
pub fn default_config_path() -> PathBuf {
    Path::new(SITE_DIR).join("config").join("portico.toml")
}

/// Loads the site configuration from `path` (the bundled file when `None`),
/// then `.env` and `PORTICO__*` overrides.
///
/// A relative `view.path` is taken relative to the site directory.
pub fn load_config(path: Option<&Path>) -> Result<PorticoConfig, ConfigError> {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    let mut config = ConfigLoader::new()
        .with_file(&path)?
        .with_dotenv()?
        .with_env_prefix("PORTICO")
        .load()?;

    if Path::new(&config.view.path).is_relative() {
        config.view.path = Path::new(SITE_DIR)
            .join(&config.view.path)
            .to_string_lossy()
            .into_owned();
    }
    Ok(config)
}

/// Builds the application with the site provider and the demo accounts.
pub fn application(config: PorticoConfig) -> anyhow::Result<Application> {
    let app = Application::new(config).provider(SiteProvider::new());
    seed_users(app.user_provider().as_ref())?;
    Ok(app)
}
