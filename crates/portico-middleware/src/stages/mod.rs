//! Built-in middleware classes.
//!
//! Each stage is an [`Injectable`] registered under its class name, so
//! configuration and route tags refer to it by name:
//!
//! - [`request_id`] - `request_id`
//! - [`session`] - `start_session`
//! - [`auth`] - `authenticate`, `redirect_if_authenticated`, `require_role`,
//!   `require_permission`
//! - [`security`] - `security_headers`, `force_https`, `verify_csrf`

pub mod auth;
pub mod request_id;
pub mod security;
pub mod session;

use portico_config::{AuthConfig, PorticoConfig};
use portico_core::di::{Container, ContainerError, Injectable, Resolver};
use portico_core::keys;

use crate::middleware::MiddlewareRegistry;

pub use auth::{Authenticate, RedirectIfAuthenticated, RequirePermission, RequireRole};
pub use request_id::RequestIdMiddleware;
pub use security::{ForceHttps, SecurityHeaders, VerifyCsrf};
pub use session::StartSession;

/// Registers every built-in middleware class on `container`.
pub fn register_builtin(container: &Container) {
    container.register_middleware::<RequestIdMiddleware>();
    container.register_middleware::<StartSession>();
    container.register_middleware::<Authenticate>();
    container.register_middleware::<RedirectIfAuthenticated>();
    container.register_middleware::<RequireRole>();
    container.register_middleware::<RequirePermission>();
    container.register_middleware::<SecurityHeaders>();
    container.register_middleware::<ForceHttps>();
    container.register_middleware::<VerifyCsrf>();
}

/// Class names of the built-in middleware, in registration order.
#[must_use]
pub fn builtin_classes() -> [&'static str; 9] {
    [
        RequestIdMiddleware::CLASS,
        StartSession::CLASS,
        Authenticate::CLASS,
        RedirectIfAuthenticated::CLASS,
        RequireRole::CLASS,
        RequirePermission::CLASS,
        SecurityHeaders::CLASS,
        ForceHttps::CLASS,
        VerifyCsrf::CLASS,
    ]
}

/// The `auth` section of the registered configuration, or its defaults.
fn auth_settings(resolver: &mut Resolver<'_>) -> Result<AuthConfig, ContainerError> {
    Ok(resolver
        .optional::<PorticoConfig>("config", keys::CONFIG)?
        .map(|config| config.auth.clone())
        .unwrap_or_default())
}
