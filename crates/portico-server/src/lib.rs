//! # Portico Server
//!
//! Request orchestration and HTTP serving for Portico:
//!
//! - [`Application`] - builds a container per request, resolves the route,
//!   runs the middleware chain and calls the controller action
//! - [`ServiceProvider`] - how an application registers its controllers,
//!   middleware, routes and listeners
//! - [`ErrorHandler`] - renders errors that escape the chain
//! - [`View`] - `minijinja` templates loaded from a directory
//! - [`Server`] - hyper HTTP/1.1 server with graceful shutdown

#![doc(html_root_url = "https://docs.rs/portico-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;
mod error_handler;
mod server;
pub mod shutdown;
mod view;

pub use application::{Application, ServiceProvider};
pub use error::ServerError;
pub use error_handler::{ErrorHandler, ERROR_TEMPLATE};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use view::View;
