//! Error types for Portico.
//!
//! This module provides the [`PorticoError`] type, the error returned by
//! every fallible step of request dispatch: container resolution, routing,
//! middleware expansion and controller actions.
//!
//! Errors are classified by [`ErrorCategory`], which carries the default
//! HTTP status used by the error handler when it renders a page.

use http::StatusCode;
use portico_router::RouterError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::di::ContainerError;

/// Result type alias using [`PorticoError`].
pub type PorticoResult<T> = Result<T, PorticoError>;

/// Categories of errors for classification and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A service could not be built by the container.
    Container,
    /// No route or controller action matched the request.
    NotFound,
    /// The middleware configuration is broken (cycles, bad references).
    Middleware,
    /// An error carrying its own HTTP status.
    Http,
    /// Internal server errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Container | Self::Middleware | Self::Http | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Standard error type for Portico.
///
/// # Example
///
/// ```
/// use portico_core::{PorticoError, ErrorCategory};
/// use http::StatusCode;
///
/// let err = PorticoError::http(StatusCode::FORBIDDEN, "CSRF token mismatch");
/// assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
/// assert_eq!(err.category(), ErrorCategory::Http);
/// ```
#[derive(Error, Debug)]
pub enum PorticoError {
    /// The container failed to resolve a service.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// No route matched the request.
    #[error("No route matches {method} {path}")]
    RouteNotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The matched controller does not expose the requested action.
    #[error("Action '{action}' not found on controller '{controller}'")]
    ActionNotFound {
        /// Controller identifier.
        controller: String,
        /// Action name.
        action: String,
    },

    /// A middleware group expands into itself.
    #[error("Middleware group cycle detected: {}", chain.join(" -> "))]
    MiddlewareCycle {
        /// The group names visited, ending with the repeated one.
        chain: Vec<String>,
    },

    /// An error with an explicit HTTP status.
    #[error("{message}")]
    Http {
        /// Status to respond with.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl PorticoError {
    /// Creates a route-not-found error.
    #[must_use]
    pub fn route_not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::RouteNotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Creates an action-not-found error.
    #[must_use]
    pub fn action_not_found(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::ActionNotFound {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// Creates an error that renders with the given status.
    #[must_use]
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Container(_) => ErrorCategory::Container,
            Self::RouteNotFound { .. } | Self::ActionNotFound { .. } => ErrorCategory::NotFound,
            Self::MiddlewareCycle { .. } => ErrorCategory::Middleware,
            Self::Http { .. } => ErrorCategory::Http,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            _ => self.category().default_status_code(),
        }
    }

    /// Returns `true` when the error is the router's not-found classification.
    #[must_use]
    pub const fn is_route_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. })
    }

    /// Returns a short, stable name for the variant, used in logs and debug pages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Container(inner) => inner.kind(),
            Self::RouteNotFound { .. } => "RouteNotFound",
            Self::ActionNotFound { .. } => "ActionNotFound",
            Self::MiddlewareCycle { .. } => "MiddlewareCycle",
            Self::Http { .. } => "HttpError",
            Self::Internal { .. } => "InternalError",
        }
    }
}

impl From<RouterError> for PorticoError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::NotFound { method, path } => Self::RouteNotFound { method, path },
            other @ RouterError::InvalidPattern { .. } => {
                Self::internal_with_source("invalid route pattern", other)
            }
        }
    }
}
