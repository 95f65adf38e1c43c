//! Controller contract.
//!
//! A controller is a container class exposing named actions. The router
//! yields a controller identifier and an action name; the application's
//! terminal target resolves the controller through the container and calls
//! the action with the positional route parameters.

use portico_router::Params;
use std::sync::Arc;

use crate::di::{Container, Injectable, Service};
use crate::error::{PorticoError, PorticoResult};
use crate::types::{BoxFuture, Request, Response};

/// A set of request actions.
///
/// # Example
///
/// ```rust
/// use portico_core::controller::{unknown_action, Controller};
/// use portico_core::types::{BoxFuture, Request, Response, ResponseExt};
/// use portico_core::PorticoResult;
/// use portico_router::Params;
/// use http::StatusCode;
/// use std::sync::Arc;
///
/// struct PingController;
///
/// impl Controller for PingController {
///     fn call(
///         self: Arc<Self>,
///         action: &str,
///         _request: Request,
///         _response: Response,
///         _params: Params,
///     ) -> BoxFuture<'static, PorticoResult<Response>> {
///         match action {
///             "ping" => Box::pin(async { Ok(Response::text(StatusCode::OK, "pong")) }),
///             other => unknown_action("ping", other),
///         }
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Invokes `action`.
    fn call(
        self: Arc<Self>,
        action: &str,
        request: Request,
        response: Response,
        params: Params,
    ) -> BoxFuture<'static, PorticoResult<Response>>;
}

/// The future returned for an action the controller does not have.
pub fn unknown_action(
    controller: &str,
    action: &str,
) -> BoxFuture<'static, PorticoResult<Response>> {
    let err = PorticoError::action_not_found(controller, action);
    Box::pin(async move { Err(err) })
}

/// Controller registration and lookup on a [`Container`].
pub trait ControllerRegistry {
    /// Registers `C` as a class whose instances are controllers.
    fn register_controller<C: Controller + Injectable>(&self);

    /// Resolves the controller registered under `name`.
    fn controller(&self, name: &str) -> PorticoResult<Arc<dyn Controller>>;
}

impl ControllerRegistry for Container {
    fn register_controller<C: Controller + Injectable>(&self) {
        self.register_class_with(C::CLASS, |resolver| {
            let controller: Arc<dyn Controller> = Arc::new(C::construct(resolver)?);
            Ok(Arc::new(controller) as Service)
        });
    }

    fn controller(&self, name: &str) -> PorticoResult<Arc<dyn Controller>> {
        let controller = self.make_as::<Arc<dyn Controller>>(name)?;
        Ok(Arc::clone(&*controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::{ContainerError, Resolver};
    use crate::types::{body_text, ResponseExt};
    use http::StatusCode;

    struct EchoController {
        prefix: String,
    }

    impl Injectable for EchoController {
        const CLASS: &'static str = "echo";

        fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            Ok(Self {
                prefix: resolver.value_or("prefix", "echo".to_string()),
            })
        }
    }

    impl Controller for EchoController {
        fn call(
            self: Arc<Self>,
            action: &str,
            _request: Request,
            _response: Response,
            params: Params,
        ) -> BoxFuture<'static, PorticoResult<Response>> {
            match action {
                "show" => Box::pin(async move {
                    let id = params.get(0).unwrap_or_default();
                    Ok(Response::text(StatusCode::OK, format!("{}:{id}", self.prefix)))
                }),
                other => unknown_action("echo", other),
            }
        }
    }

    fn request() -> Request {
        http::Request::new(http_body_util::Full::new(bytes::Bytes::new()))
    }

    #[tokio::test]
    async fn test_controller_resolves_and_runs_action() {
        let container = Container::new();
        container.register_controller::<EchoController>();

        let controller = container.controller("echo").unwrap();
        let params: Params = vec!["42".to_string()].into();
        let response = controller
            .call("show", request(), Response::empty(), params)
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "echo:42");
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_found() {
        let container = Container::new();
        container.register_controller::<EchoController>();

        let controller = container.controller("echo").unwrap();
        let err = controller
            .call("destroy", request(), Response::empty(), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_non_controller_class_is_type_mismatch() {
        let container = Container::new();
        container.instance("echo", Arc::new(5_u8));
        let err = container.controller("echo").err().unwrap();
        assert_eq!(err.kind(), "TypeMismatch");
    }
}
