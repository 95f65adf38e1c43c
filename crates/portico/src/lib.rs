//! # Portico
//!
//! An MVC web framework built around a string-keyed dependency injection
//! container:
//!
//! - **Container** - classes, singletons and instances resolved by name
//! - **Router** - `{param}` patterns compiled to anchored regexes, first
//!   match wins
//! - **Middleware** - an onion chain built from global middleware, groups
//!   and parameterised aliases (`role:admin`, `csrf:login`)
//! - **Sessions and auth** - server-side sessions, argon2 passwords, CSRF
//!   tokens and role/permission checks
//! - **Events** - named listeners dispatched synchronously
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use portico::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new()
//!         .with_defaults()
//!         .with_optional_file("config/portico.toml")
//!         .with_env_prefix("PORTICO")
//!         .load()?;
//!     init_telemetry(&TelemetryConfig::from_config(&config))?;
//!
//!     let app = Application::new(config).provider(MyProvider);
//!     Server::new(app).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Request -> Container -> Router::resolve -> global, group and route middleware
//!                                                     |
//! Response <- ErrorHandler <-------------------- controller action
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use portico_config as config;
pub use portico_core as core;
pub use portico_middleware as middleware;
pub use portico_router as router;
pub use portico_server as server;
pub use portico_session as session;
pub use portico_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use portico::prelude::*;
/// ```
pub mod prelude {
    pub use portico_config::{ConfigLoader, PorticoConfig, RouteConfig};
    pub use portico_core::controller::{unknown_action, Controller, ControllerRegistry};
    pub use portico_core::di::{Container, ContainerError, Injectable, Resolver};
    pub use portico_core::events::{Event, EventDispatcher, EventListener, FnListener};
    pub use portico_core::types::{
        body_text, read_form, BoxFuture, FormData, Request, Response, ResponseExt,
    };
    pub use portico_core::validation::{ValidationErrors, Validator};
    pub use portico_core::{keys, PorticoError, PorticoResult, RequestId};
    pub use portico_middleware::{
        Middleware, MiddlewareEntry, MiddlewareManager, MiddlewareRegistry, Next,
    };
    pub use portico_router::{Params, Router};
    pub use portico_server::{Application, ErrorHandler, Server, ServiceProvider, View};
    pub use portico_session::{
        Auth, NewUser, Security, Session, User, UserLoggedIn, UserProvider, UserRegistered,
    };
    pub use portico_telemetry::{init_telemetry, TelemetryConfig};
}
