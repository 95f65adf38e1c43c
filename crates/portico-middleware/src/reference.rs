//! Middleware references and their resolved form.

use portico_core::di::{Container, Parameters};
use portico_core::keys;
use portico_core::PorticoResult;
use std::fmt;
use std::sync::Arc;

use crate::middleware::Middleware;

/// A middleware reference as written in configuration or route tags.
///
/// A name is looked up as a group, then as an alias (`role:admin` looks up
/// `role` and carries `admin` as an argument), and is otherwise taken as a
/// class name for the container.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// A group, alias or class name.
    Name(String),
    /// Several references, expanded in order.
    List(Vec<MiddlewareRef>),
    /// A ready middleware value.
    Callable(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    /// A reference to a middleware value.
    pub fn callable(middleware: impl Middleware) -> Self {
        Self::Callable(Arc::new(middleware))
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Callable(middleware)
    }
}

impl<T: Into<MiddlewareRef>> From<Vec<T>> for MiddlewareRef {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Callable(m) => f.debug_tuple("Callable").field(&m.name()).finish(),
        }
    }
}

/// A flattened chain entry.
#[derive(Clone)]
pub enum MiddlewareEntry {
    /// A class resolved through the container when its link runs.
    Class {
        /// Class name.
        class: String,
        /// Alias arguments, passed as the `parameters` extra parameter.
        arguments: Vec<String>,
    },
    /// A ready middleware value.
    Callable(Arc<dyn Middleware>),
}

impl MiddlewareEntry {
    /// A class entry without arguments.
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class {
            class: class.into(),
            arguments: Vec::new(),
        }
    }

    /// A readable label such as `require_role:admin`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Class { class, arguments } if arguments.is_empty() => class.clone(),
            Self::Class { class, arguments } => format!("{class}:{}", arguments.join(",")),
            Self::Callable(m) => m.name().to_string(),
        }
    }

    /// Produces the middleware value, building classes through the container.
    pub fn instantiate(&self, container: &Container) -> PorticoResult<Arc<dyn Middleware>> {
        match self {
            Self::Class { class, arguments } => {
                let params = Parameters::new().with(keys::PARAMETERS, arguments.clone());
                let middleware = container.make_as_with::<Arc<dyn Middleware>>(class, &params)?;
                Ok(Arc::clone(&*middleware))
            }
            Self::Callable(middleware) => Ok(Arc::clone(middleware)),
        }
    }
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl PartialEq for MiddlewareEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Class { class, arguments },
                Self::Class {
                    class: other_class,
                    arguments: other_arguments,
                },
            ) => class == other_class && arguments == other_arguments,
            (Self::Callable(a), Self::Callable(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Splits `alias:arg1,arg2` into the alias and its arguments.
pub(crate) fn split_arguments(name: &str) -> (&str, Vec<String>) {
    match name.split_once(':') {
        Some((alias, args)) => (
            alias,
            args.split(',')
                .map(str::trim)
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (name, Vec::new()),
    }
}
