//! Request orchestration.
//!
//! An [`Application`] holds what lives across requests: configuration,
//! session store, user provider, templates and service providers. Every
//! request gets a fresh [`Container`] wired from those, a fresh route table
//! and middleware manager, and a chain that ends in the matched controller
//! action.
//!
//! ```text
//! request -> boot container -> Router::resolve -> resolve_tags
//!         -> MiddlewareManager::run -> controller action
//! ```

use http::Method;
use portico_config::PorticoConfig;
use portico_core::controller::ControllerRegistry;
use portico_core::di::{Container, Injectable};
use portico_core::events::{Event, EventDispatcher, FnListener};
use portico_core::keys;
use portico_core::types::{Request, Response, ResponseExt};
use portico_core::{PorticoError, PorticoResult};
use portico_middleware::stages::{register_builtin, ForceHttps, SecurityHeaders};
use portico_middleware::{MiddlewareManager, Next};
use portico_router::{RouteMatch, Router};
use portico_session::{
    Auth, InMemoryUserProvider, MemorySessionStore, Security, Session, SessionStore,
    UserLoggedIn, UserProvider,
};
use portico_telemetry::record_login;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error_handler::ErrorHandler;
use crate::view::View;

/// Registers an application's own services on each request container.
///
/// Only [`register`](ServiceProvider::register) is required. The other
/// hooks add routes, middleware and event listeners next to the ones built
/// from configuration.
pub trait ServiceProvider: Send + Sync + 'static {
    /// Registers classes (controllers, middleware, services).
    fn register(&self, container: &Container);

    /// Adds routes after the configured ones.
    fn routes(&self, _router: &mut Router) -> PorticoResult<()> {
        Ok(())
    }

    /// Adds global middleware, groups or aliases.
    fn middleware(&self, _manager: &mut MiddlewareManager) {}

    /// Subscribes event listeners.
    fn listen(&self, _events: &EventDispatcher) {}
}

/// The per-request services [`Application::run`] works with.
struct Scope {
    container: Arc<Container>,
    router: Arc<Router>,
    manager: Arc<MiddlewareManager>,
}

/// A Portico application.
///
/// # Example
///
/// ```rust
/// use portico_config::PorticoConfig;
/// use portico_server::Application;
///
/// let app = Application::new(PorticoConfig::default());
/// assert_eq!(app.config().app.name, "Portico");
/// ```
pub struct Application {
    config: Arc<PorticoConfig>,
    session_store: Arc<dyn SessionStore>,
    users: Arc<dyn UserProvider>,
    view: Arc<View>,
    providers: Vec<Arc<dyn ServiceProvider>>,
    errors: ErrorHandler,
}

impl Application {
    /// Creates an application with in-memory stores and templates loaded
    /// from `config.view.path`.
    pub fn new(config: PorticoConfig) -> Self {
        let session_store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(
            Duration::from_secs(config.session.lifetime_secs),
        ));
        let users: Arc<dyn UserProvider> = Arc::new(InMemoryUserProvider::new());
        let view = Arc::new(View::from_path(&config.view.path, &config.app.name));
        let errors = ErrorHandler::new(config.app.debug, Arc::clone(&view));
        Self {
            config: Arc::new(config),
            session_store,
            users,
            view,
            providers: Vec::new(),
            errors,
        }
    }

    /// Adds a service provider. Providers run in the order they are added.
    pub fn provider(mut self, provider: impl ServiceProvider) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Replaces the session store.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = store;
        self
    }

    /// Replaces the user provider.
    pub fn users(mut self, users: Arc<dyn UserProvider>) -> Self {
        self.users = users;
        self
    }

    /// Replaces the template renderer.
    pub fn view(mut self, view: View) -> Self {
        self.view = Arc::new(view);
        self.errors = ErrorHandler::new(self.config.app.debug, Arc::clone(&self.view));
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &PorticoConfig {
        &self.config
    }

    /// The user provider shared by all requests.
    #[must_use]
    pub fn user_provider(&self) -> &Arc<dyn UserProvider> {
        &self.users
    }

    /// The session store shared by all requests.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.session_store
    }

    /// The error handler used by [`handle`](Self::handle).
    #[must_use]
    pub fn error_handler(&self) -> &ErrorHandler {
        &self.errors
    }

    /// Dispatches `request` through its route's middleware chain.
    ///
    /// An unmatched route is answered with the not-found page. Every other
    /// error is returned to the caller.
    pub async fn run(&self, request: Request) -> PorticoResult<Response> {
        let scope = self.boot()?;

        let found = match scope.router.resolve(request.method(), request.uri().path()) {
            Ok(found) => found,
            Err(err) => {
                let err = PorticoError::from(err);
                if err.is_route_not_found() {
                    return Ok(self.errors.not_found(&err));
                }
                return Err(err);
            }
        };

        tracing::debug!(
            controller = %found.controller,
            action = %found.action,
            params = ?found.params,
            "route matched"
        );

        let middleware = scope.manager.resolve_tags(&found.middleware)?;
        let target = controller_target(Arc::clone(&scope.container), found);
        scope
            .manager
            .run(scope.container, request, Response::empty(), middleware, target)
            .await
    }

    /// Dispatches `request`, rendering any error into a response.
    pub async fn handle(&self, request: Request) -> Response {
        match self.run(request).await {
            Ok(response) => response,
            Err(err) => self.errors.render(&err),
        }
    }

    /// Builds the container, routes and middleware for one request.
    fn boot(&self) -> PorticoResult<Scope> {
        let container = Container::new();
        container.instance(keys::CONFIG, Arc::clone(&self.config));
        container.instance(keys::SESSION_STORE, Arc::new(Arc::clone(&self.session_store)));
        container.instance(keys::USERS, Arc::new(Arc::clone(&self.users)));
        container.instance(keys::VIEW, Arc::clone(&self.view));

        container.register_class::<Session>();
        container.register_class::<Security>();
        container.register_class::<Auth>();
        container.register_class::<EventDispatcher>();
        for class in [
            Session::CLASS,
            Security::CLASS,
            Auth::CLASS,
            EventDispatcher::CLASS,
        ] {
            container.singleton(class, None);
        }
        register_builtin(&container);

        let events = container.resolve::<EventDispatcher>()?;
        events.add_listener(
            UserLoggedIn::NAME,
            Arc::new(FnListener::new(|_: &dyn Event| {
                record_login(true);
            })),
        );

        let mut router = self.configured_routes()?;
        let mut manager = self.configured_middleware();
        for provider in &self.providers {
            provider.register(&container);
            provider.routes(&mut router)?;
            provider.middleware(&mut manager);
            provider.listen(&events);
        }

        let router = Arc::new(router);
        let manager = Arc::new(manager);
        container.instance(keys::ROUTER, Arc::clone(&router));
        container.instance(keys::MIDDLEWARE, Arc::clone(&manager));

        Ok(Scope {
            container: Arc::new(container),
            router,
            manager,
        })
    }

    fn configured_routes(&self) -> PorticoResult<Router> {
        let mut router = Router::new();
        for route in &self.config.routes {
            let method = Method::from_bytes(route.method.as_bytes()).map_err(|e| {
                PorticoError::internal_with_source(
                    format!("Invalid method '{}' for route '{}'", route.method, route.path),
                    e,
                )
            })?;
            router.add(
                route.path.as_str(),
                route.controller.as_str(),
                route.action.as_str(),
                method,
                route.middleware.clone(),
            )?;
        }
        Ok(router)
    }

    fn configured_middleware(&self) -> MiddlewareManager {
        let settings = &self.config.middleware;
        let mut manager = MiddlewareManager::new();
        for middleware in &settings.global {
            manager.add(middleware.as_str());
        }
        if self.config.app.secure_headers {
            manager.add(SecurityHeaders::CLASS);
        }
        if self.config.app.force_https {
            manager.add(ForceHttps::CLASS);
        }
        for (name, members) in &settings.groups {
            manager.add_group(name.as_str(), members.clone());
        }
        for (alias, class) in &settings.aliases {
            manager.add_route(alias.as_str(), class.as_str());
        }
        manager
    }
}

/// The innermost call of a route's chain: resolves the controller through
/// the request container and invokes the action with the route parameters.
///
/// Headers set on the response by earlier middleware are carried onto the
/// action's response unless the action sets the same header.
fn controller_target(container: Arc<Container>, found: RouteMatch) -> Next {
    let RouteMatch {
        controller,
        action,
        params,
        ..
    } = found;
    Next::target(move |request, response| async move {
        let instance = container.controller(&controller)?;
        let carried = response.headers().clone();
        let result = instance.call(&action, request, response, params).await?;
        Ok(result.carry_headers(&carried))
    })
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.config.app.name)
            .field("routes", &self.config.routes.len())
            .field("providers", &self.providers.len())
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{HeaderValue, CONTENT_TYPE};
    use http::StatusCode;
    use http_body_util::Full;
    use portico_config::{AppConfig, MiddlewareConfig, RouteConfig};
    use portico_core::controller::{unknown_action, Controller};
    use portico_core::di::{ContainerError, Resolver};
    use portico_core::types::{body_text, BoxFuture};
    use portico_middleware::{FnMiddleware, MiddlewareRef};
    use portico_router::Params;

    struct EchoController;

    impl Injectable for EchoController {
        const CLASS: &'static str = "echo";

        fn construct(_: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            Ok(Self)
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
                    let values: Vec<&str> = params.values().collect();
                    Ok(Response::text(StatusCode::OK, values.join(",")))
                }),
                "fail" => Box::pin(async { Err(PorticoError::internal("boom")) }),
                other => unknown_action("echo", other),
            }
        }
    }

    struct EchoProvider;

    impl ServiceProvider for EchoProvider {
        fn register(&self, container: &Container) {
            container.register_controller::<EchoController>();
        }

        fn routes(&self, router: &mut Router) -> PorticoResult<()> {
            router.add("/extra", "echo", "show", Method::GET, Vec::new())?;
            Ok(())
        }
    }

    fn config() -> PorticoConfig {
        PorticoConfig::builder()
            .app(AppConfig {
                secure_headers: false,
                ..AppConfig::default()
            })
            .route(RouteConfig::new("GET", "/echo/{a}/{b}", "echo", "show"))
            .route(RouteConfig::new("GET", "/missing", "echo", "nothing"))
            .route(RouteConfig::new("GET", "/fail", "echo", "fail"))
            .route(RouteConfig::new("GET", "/ghost", "ghost", "index"))
            .build()
    }

    fn get(uri: &str) -> Request {
        http::Request::builder()
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_params_reach_action_in_order() {
        let app = Application::new(config()).provider(EchoProvider);
        let response = app.run(get("/echo/first/second")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "first,second");
    }

    #[tokio::test]
    async fn test_provider_routes_follow_configured_ones() {
        let app = Application::new(config()).provider(EchoProvider);
        let response = app.run(get("/extra")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unmatched_route_is_a_404_page() {
        let app = Application::new(config()).provider(EchoProvider);
        let response = app.run(get("/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn test_errors_propagate_from_run() {
        let app = Application::new(config()).provider(EchoProvider);

        let err = app.run(get("/missing")).await.unwrap_err();
        assert_eq!(err.kind(), "ActionNotFound");

        let err = app.run(get("/ghost")).await.unwrap_err();
        assert_eq!(err.kind(), "BindingNotFound");
    }

    #[tokio::test]
    async fn test_handle_renders_errors() {
        let app = Application::new(config()).provider(EchoProvider);

        let response = app.handle(get("/fail")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("An error occurred"));

        let response = app.handle(get("/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_route_method() {
        let config = PorticoConfig::builder()
            .route(RouteConfig::new("GE T", "/", "echo", "show"))
            .build();
        let err = Application::new(config).run(get("/")).await.unwrap_err();
        assert_eq!(err.kind(), "InternalError");
    }

    #[tokio::test]
    async fn test_security_headers_follow_config() {
        let secured = PorticoConfig::builder()
            .route(RouteConfig::new("GET", "/echo/{a}/{b}", "echo", "show"))
            .build();
        let app = Application::new(secured).provider(EchoProvider);
        let response = app.run(get("/echo/a/b")).await.unwrap();
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");

        let app = Application::new(config()).provider(EchoProvider);
        let response = app.run(get("/echo/a/b")).await.unwrap();
        assert!(response.headers().get("x-content-type-options").is_none());
    }

    struct StampProvider;

    impl ServiceProvider for StampProvider {
        fn register(&self, _container: &Container) {}

        fn middleware(&self, manager: &mut MiddlewareManager) {
            manager.add(MiddlewareRef::callable(FnMiddleware::new(
                "stamp",
                |request: Request, mut response: Response, next: Next| async move {
                    let headers = response.headers_mut();
                    headers.insert("x-pre", HeaderValue::from_static("1"));
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    next.run(request, response).await
                },
            )));
        }
    }

    #[tokio::test]
    async fn test_headers_set_before_next_reach_the_client() {
        let app = Application::new(config())
            .provider(EchoProvider)
            .provider(StampProvider);
        let response = app.run(get("/echo/a/b")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-pre"], "1");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_unknown_global_middleware_fails_fast() {
        let mut config = config();
        config.middleware = MiddlewareConfig {
            global: vec!["does_not_exist".to_string()],
            ..MiddlewareConfig::default()
        };
        let app = Application::new(config).provider(EchoProvider);
        let response = app.handle(get("/echo/a/b")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
