//! Container keys of the services every request container carries.
//!
//! Classes implementing [`Injectable`](crate::di::Injectable) are keyed by
//! their `CLASS`; these keys name the plain instances registered next to
//! them.

/// The loaded configuration.
pub const CONFIG: &str = "config";

/// The session store shared across requests.
pub const SESSION_STORE: &str = "session.store";

/// The user provider shared across requests.
pub const USERS: &str = "users";

/// The request's route table.
pub const ROUTER: &str = "router";

/// The request's middleware manager.
pub const MIDDLEWARE: &str = "middleware";

/// Extra parameter carrying a middleware alias's arguments (`role:admin`).
pub const PARAMETERS: &str = "parameters";

/// The template renderer shared across requests.
pub const VIEW: &str = "view";
