//! Access control middleware.
//!
//! | Class                       | Alias               | Lets through              |
//! |-----------------------------|---------------------|---------------------------|
//! | `authenticate`              | `auth`              | logged-in users           |
//! | `redirect_if_authenticated` | `guest`             | guests                    |
//! | `require_role`              | `role:<roles>`      | users with any role       |
//! | `require_permission`        | `permission:<perms>`| users with any permission |
//!
//! Rejected requests are redirected with an `error` flash message.

use portico_config::AuthConfig;
use portico_core::di::{ContainerError, Injectable, Resolver};
use portico_core::keys;
use portico_core::types::{Request, Response, ResponseExt};
use portico_core::PorticoResult;
use portico_session::{Auth, Session};
use std::sync::Arc;

use super::auth_settings;
use crate::middleware::{BoxFuture, Middleware, Next};

/// Session key remembering where a guest was headed before logging in.
pub const REDIRECT_AFTER_LOGIN_KEY: &str = "redirect_after_login";

/// Redirects guests to the login page.
#[derive(Debug)]
pub struct Authenticate {
    auth: Arc<Auth>,
    session: Arc<Session>,
    settings: AuthConfig,
}

impl Injectable for Authenticate {
    const CLASS: &'static str = "authenticate";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self {
            auth: resolver.dependency::<Auth>("auth")?,
            session: resolver.dependency::<Session>("session")?,
            settings: auth_settings(resolver)?,
        })
    }
}

impl Middleware for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(async move {
            if self.auth.check() {
                return next.run(request, response).await;
            }

            let target = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.uri().path().to_string(), |pq| pq.to_string());
            tracing::debug!(target = %target, "guest redirected to login");
            self.session.set(REDIRECT_AFTER_LOGIN_KEY, target);
            self.session
                .flash("error", "Please log in to access this page");
            Ok(Response::redirect(&self.settings.login_url))
        })
    }
}

/// Sends logged-in users away from guest-only pages such as the login form.
#[derive(Debug)]
pub struct RedirectIfAuthenticated {
    auth: Arc<Auth>,
    settings: AuthConfig,
}

impl Injectable for RedirectIfAuthenticated {
    const CLASS: &'static str = "redirect_if_authenticated";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self {
            auth: resolver.dependency::<Auth>("auth")?,
            settings: auth_settings(resolver)?,
        })
    }
}

impl Middleware for RedirectIfAuthenticated {
    fn name(&self) -> &'static str {
        "redirect_if_authenticated"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(async move {
            if self.auth.check() {
                return Ok(Response::redirect(&self.settings.redirect_after_login));
            }
            next.run(request, response).await
        })
    }
}

/// What a [`Guard`] checks the logged-in user against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Role,
    Permission,
}

/// Shared body of [`RequireRole`] and [`RequirePermission`].
#[derive(Debug)]
struct Guard {
    requirement: Requirement,
    required: Vec<String>,
    auth: Arc<Auth>,
    session: Arc<Session>,
    settings: AuthConfig,
}

impl Guard {
    fn construct(
        requirement: Requirement,
        resolver: &mut Resolver<'_>,
    ) -> Result<Self, ContainerError> {
        let required = resolver.value_or::<Vec<String>>(keys::PARAMETERS, Vec::new());
        if required.is_empty() {
            let message = match requirement {
                Requirement::Role => "no role given, use `role:<name>`",
                Requirement::Permission => "no permission given, use `permission:<name>`",
            };
            return Err(resolver.construction_failed(message));
        }
        Ok(Self {
            requirement,
            required,
            auth: resolver.dependency::<Auth>("auth")?,
            session: resolver.dependency::<Session>("session")?,
            settings: auth_settings(resolver)?,
        })
    }

    fn allows(&self) -> bool {
        match self.requirement {
            Requirement::Role => self.auth.has_role(self.required.as_slice()),
            Requirement::Permission => self.auth.can(self.required.as_slice()),
        }
    }

    async fn handle(
        &self,
        request: Request,
        response: Response,
        next: Next,
    ) -> PorticoResult<Response> {
        if self.allows() {
            return next.run(request, response).await;
        }

        let message = match self.requirement {
            Requirement::Role => "You are not allowed to access this page",
            Requirement::Permission => "You do not have the permissions required for this page",
        };
        self.session.flash("error", message);

        if self.auth.guest() {
            return Ok(Response::redirect(&self.settings.login_url));
        }
        tracing::info!(
            required = ?self.required,
            user_id = ?self.auth.id(),
            "access denied"
        );
        Ok(Response::redirect(&self.settings.unauthorized_url))
    }
}

/// Lets through users holding any of the roles given as arguments.
#[derive(Debug)]
pub struct RequireRole(Guard);

impl RequireRole {
    /// The roles this instance accepts.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.0.required
    }
}

impl Injectable for RequireRole {
    const CLASS: &'static str = "require_role";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Guard::construct(Requirement::Role, resolver).map(Self)
    }
}

impl Middleware for RequireRole {
    fn name(&self) -> &'static str {
        "require_role"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(self.0.handle(request, response, next))
    }
}

/// Lets through users holding any of the permissions given as arguments.
#[derive(Debug)]
pub struct RequirePermission(Guard);

impl RequirePermission {
    /// The permissions this instance accepts.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        &self.0.required
    }
}

impl Injectable for RequirePermission {
    const CLASS: &'static str = "require_permission";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Guard::construct(Requirement::Permission, resolver).map(Self)
    }
}

impl Middleware for RequirePermission {
    fn name(&self) -> &'static str {
        "require_permission"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(self.0.handle(request, response, next))
    }
}
