//! Request ID middleware.
//!
//! Every request gets a [`RequestId`] (UUID v7, so ids sort by arrival).
//! The id is stored in the request extensions, recorded on a tracing span
//! that wraps the rest of the chain, and echoed in the `x-request-id`
//! response header so clients can quote it when reporting problems.
//!
//! An incoming `x-request-id` is ignored unless the middleware is built
//! with the `trusted` argument (`request_id:trusted`), which suits
//! deployments behind a proxy that already assigns ids.

use http::HeaderValue;
use portico_core::di::{ContainerError, Injectable, Resolver};
use portico_core::keys;
use portico_core::types::{Request, Response};
use portico_core::{PorticoResult, RequestId};
use tracing::Instrument;

use crate::middleware::{BoxFuture, Middleware, Next};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that generates or extracts request IDs.
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates the middleware. Incoming ids are not trusted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses a valid incoming `x-request-id`.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| s.parse().ok())
    }
}

impl Injectable for RequestIdMiddleware {
    const CLASS: &'static str = "request_id";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let arguments = resolver.value_or::<Vec<String>>(keys::PARAMETERS, Vec::new());
        Ok(Self {
            trust_incoming: arguments.iter().any(|arg| arg == "trusted"),
        })
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn handle<'a>(
        &'a self,
        mut request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        let request_id = self
            .extract_request_id(&request)
            .unwrap_or_else(RequestId::new);
        request.extensions_mut().insert(request_id);

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        );

        Box::pin(
            async move {
                let mut response = next.run(request, response).await?;
                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
