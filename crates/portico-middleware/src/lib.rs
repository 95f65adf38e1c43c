//! # Portico Middleware
//!
//! The middleware chain that wraps every controller call.
//!
//! A request passes through the global middleware first, then through the
//! middleware tagged on its route, and finally reaches the controller. Each
//! middleware may act before and after the rest of the chain, or answer on
//! its own without calling it:
//!
//! ```text
//! request_id → start_session → authenticate → controller
//!                                                  ↓
//! request_id ← start_session ← authenticate ←──────┘
//! ```
//!
//! ## References
//!
//! Route tags and configuration name middleware with strings. The
//! [`MiddlewareManager`] expands a name as:
//!
//! 1. a **group** - a named list, expanded recursively (`web`, `admin`)
//! 2. an **alias** - a short name for a class, with optional arguments
//!    (`role:admin,editor`)
//! 3. a **class** - resolved through the request's container when its link
//!    runs
//!
//! A group that contains itself, directly or through other groups, is
//! reported as [`PorticoError::MiddlewareCycle`](portico_core::PorticoError)
//! instead of recursing. A class that does not resolve to a middleware fails
//! the request.
//!
//! ## Built-in middleware
//!
//! See [`stages`] for the classes registered by [`stages::register_builtin`].

#![doc(html_root_url = "https://docs.rs/portico-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod manager;
pub mod middleware;
mod reference;
pub mod stages;

pub use manager::MiddlewareManager;
pub use middleware::{BoxFuture, FnMiddleware, Middleware, MiddlewareRegistry, Next, Target};
pub use reference::{MiddlewareEntry, MiddlewareRef};
