//! Core middleware trait and the chain continuation.
//!
//! A middleware receives the request, the response built so far and a
//! [`Next`] continuation. Calling `next.run(request, response)` hands
//! control to the rest of the chain and yields its response; returning
//! without calling it short-circuits the chain.
//!
//! # Example
//!
//! ```ignore
//! use portico_middleware::{BoxFuture, Middleware, Next};
//! use portico_core::types::{Request, Response};
//! use portico_core::PorticoResult;
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         request: Request,
//!         response: Response,
//!         next: Next,
//!     ) -> BoxFuture<'a, PorticoResult<Response>> {
//!         Box::pin(async move {
//!             let started = std::time::Instant::now();
//!             let response = next.run(request, response).await;
//!             tracing::debug!(elapsed = ?started.elapsed(), "request handled");
//!             response
//!         })
//!     }
//! }
//! ```

use portico_core::di::{Container, Injectable, Service};
use portico_core::types::{Request, Response};
use portico_core::PorticoResult;
use std::future::Future;
use std::sync::Arc;

use crate::reference::MiddlewareEntry;

pub use portico_core::types::BoxFuture;

/// The middleware contract.
///
/// # Invariants
///
/// - Call `next.run()` at most once; not calling it short-circuits.
/// - Do not swallow errors returned by the rest of the chain.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, usually around a call to `next`.
    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>>;
}

/// The innermost call of a chain.
pub type Target =
    Box<dyn FnOnce(Request, Response) -> BoxFuture<'static, PorticoResult<Response>> + Send>;

/// The rest of the middleware chain.
pub struct Next {
    inner: NextInner,
}

enum NextInner {
    Link {
        entry: MiddlewareEntry,
        container: Arc<Container>,
        next: Box<Next>,
    },
    Target(Target),
}

impl Next {
    /// A chain end that calls `target`.
    pub fn target<F, Fut>(target: F) -> Self
    where
        F: FnOnce(Request, Response) -> Fut + Send + 'static,
        Fut: Future<Output = PorticoResult<Response>> + Send + 'static,
    {
        Self {
            inner: NextInner::Target(Box::new(move |request, response| {
                Box::pin(target(request, response))
            })),
        }
    }

    /// A chain end that returns the response it is given.
    pub fn passthrough() -> Self {
        Self::target(|_, response| async move { Ok(response) })
    }

    /// Wraps `next` with `entry`, resolved through `container` when run.
    pub(crate) fn link(entry: MiddlewareEntry, container: Arc<Container>, next: Self) -> Self {
        Self {
            inner: NextInner::Link {
                entry,
                container,
                next: Box::new(next),
            },
        }
    }

    /// Continues the chain. Consumes `self`, so it runs at most once.
    pub async fn run(self, request: Request, response: Response) -> PorticoResult<Response> {
        match self.inner {
            NextInner::Link {
                entry,
                container,
                next,
            } => {
                let middleware = entry.instantiate(&container)?;
                tracing::trace!(middleware = middleware.name(), "entering middleware");
                middleware.handle(request, response, *next).await
            }
            NextInner::Target(target) => target(request, response).await,
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NextInner::Link { entry, .. } => f.debug_tuple("Next").field(entry).finish(),
            NextInner::Target(_) => f.write_str("Next(target)"),
        }
    }
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```ignore
/// let stamp = FnMiddleware::new("stamp", |request, response, next: Next| async move {
///     let mut response = next.run(request, response).await?;
///     response.headers_mut().insert("x-stamp", HeaderValue::from_static("1"));
///     Ok(response)
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PorticoResult<Response>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin((self.func)(request, response, next))
    }
}

/// Middleware class registration on a [`Container`].
pub trait MiddlewareRegistry {
    /// Registers `M` as a class whose instances are middleware.
    fn register_middleware<M: Middleware + Injectable>(&self);
}

impl MiddlewareRegistry for Container {
    fn register_middleware<M: Middleware + Injectable>(&self) {
        self.register_class_with(M::CLASS, |resolver| {
            let middleware: Arc<dyn Middleware> = Arc::new(M::construct(resolver)?);
            Ok(Arc::new(middleware) as Service)
        });
    }
}
