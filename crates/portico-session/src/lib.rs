//! # Portico Session
//!
//! Per-request session state and the services built on it:
//!
//! - [`Session`] - cookie-identified key/value data with flash messages
//! - [`SessionStore`] - where session data lives between requests
//! - [`Security`] - CSRF tokens, Argon2 password hashing, escaping
//! - [`Auth`] - login, logout and role/permission checks
//! - [`UserProvider`] - user lookup for [`Auth`]
//!
//! Every service here is [`Injectable`](portico_core::di::Injectable), so a
//! request container builds `auth` by building `session` first, which in
//! turn pulls the shared store registered under
//! [`keys::SESSION_STORE`](portico_core::keys::SESSION_STORE).
//!
//! ## Example
//!
//! ```rust
//! use portico_config::SessionConfig;
//! use portico_session::{MemorySessionStore, Session};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
//! let session = Session::new(store, SessionConfig::default());
//! session.start(None);
//! session.set("theme", "dark");
//! assert_eq!(session.get_as::<String>("theme").as_deref(), Some("dark"));
//! ```

#![doc(html_root_url = "https://docs.rs/portico-session/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod error;
mod security;
mod session;
mod store;
mod user;

pub use auth::{Auth, UserLoggedIn, UserRegistered, AUTH_USER_KEY};
pub use error::SessionError;
pub use security::{Security, CSRF_FIELD, CSRF_HEADER};
pub use session::Session;
pub use store::{MemorySessionStore, SessionData, SessionStore};
pub use user::{InMemoryUserProvider, NewUser, User, UserProvider};
