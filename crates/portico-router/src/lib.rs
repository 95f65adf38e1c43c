//! Ordered regex router for Portico.
//!
//! Routes are kept in registration order and matched linearly; the first
//! route whose method and path pattern both match wins. Path patterns use
//! `{name}` placeholders that each capture a single non-empty segment, and
//! captured values are handed to actions positionally.
//!
//! A linear scan is the right tool for a hand-maintained table of a few
//! dozen routes.
//!
//! # Example
//!
//! ```rust
//! use portico_router::{Router, RouterError};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add("/", "home", "index", Method::GET, vec!["web".into()]).unwrap();
//!
//! let found = router.resolve(&Method::GET, "/").unwrap();
//! assert_eq!(found.controller, "home");
//!
//! let missing = router.resolve(&Method::GET, "/nope");
//! assert!(matches!(missing, Err(RouterError::NotFound { .. })));
//! ```

#![doc(html_root_url = "https://docs.rs/portico-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod params;
mod router;

pub use error::RouterError;
pub use params::Params;
pub use router::{Route, RouteMatch, Router};
