//! Session and authentication errors.

use thiserror::Error;

/// Errors raised by the session, security and user components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// A user with this email already exists.
    #[error("a user with email '{email}' already exists")]
    DuplicateEmail {
        /// The conflicting email.
        email: String,
    },
}
