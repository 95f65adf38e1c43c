//! Router errors.

use thiserror::Error;

/// Errors raised while registering or resolving routes.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No route matches the request. Classified as a 404.
    #[error("No route matches {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The path pattern does not compile.
    #[error("Invalid route pattern '{pattern}'")]
    InvalidPattern {
        /// The pattern as registered.
        pattern: String,
        /// The regex compiler's error.
        #[source]
        source: regex::Error,
    },
}
