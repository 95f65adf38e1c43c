//! Login, logout and the access-denied page.

use std::sync::Arc;

use http::StatusCode;
use portico::config::{AuthConfig, PorticoConfig};
use portico::core::controller::{unknown_action, Controller};
use portico::core::di::{ContainerError, Injectable, Resolver};
use portico::core::keys;
use portico::core::types::{read_form, BoxFuture, Request, Response, ResponseExt};
use portico::core::PorticoResult;
use portico::middleware::stages::auth::REDIRECT_AFTER_LOGIN_KEY;
use portico::router::Params;
use serde_json::json;

use crate::page::Page;

/// Form name the login CSRF token is issued for.
const LOGIN_FORM: &str = "login";

/// Session authentication.
#[derive(Debug)]
pub struct AuthController {
    page: Arc<Page>,
    settings: AuthConfig,
}

impl AuthController {
    fn login_form(&self) -> PorticoResult<Response> {
        let email = self
            .page
            .session()
            .take_flash("email")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();
        self.page.render(
            "auth/login.html",
            json!({
                "title": "Log in",
                "email": email,
                "csrf_field": self.page.security().csrf_field(LOGIN_FORM),
            }),
        )
    }

    async fn login(&self, request: Request) -> PorticoResult<Response> {
        let (_, form) = read_form(request).await;
        let email = form.get("email").map_or("", String::as_str).trim();
        let password = form.get("password").map_or("", String::as_str);
        let session = self.page.session();

        if email.is_empty() || password.is_empty() {
            session.flash("error", "Email and password are required");
            session.flash("email", email);
            return Ok(Response::redirect(&self.settings.login_url));
        }

        if !self.page.auth().attempt(email, password) {
            session.flash("error", "Invalid email or password");
            session.flash("email", email);
            return Ok(Response::redirect(&self.settings.login_url));
        }

        let target = session
            .remove(REDIRECT_AFTER_LOGIN_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| self.settings.redirect_after_login.clone());
        if let Some(user) = self.page.auth().user() {
            session.flash("success", format!("Welcome back, {}", user.name));
        }
        Ok(Response::redirect(&target))
    }

    fn logout(&self) -> Response {
        self.page.auth().logout();
        self.page.session().flash("success", "You have been logged out");
        Response::redirect("/")
    }

    fn unauthorised(&self) -> PorticoResult<Response> {
        self.page.render_with(
            StatusCode::FORBIDDEN,
            "auth/unauthorised.html",
            json!({ "title": "Access denied" }),
        )
    }
}

impl Injectable for AuthController {
    const CLASS: &'static str = "AuthController";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let settings = resolver
            .optional::<PorticoConfig>("config", keys::CONFIG)?
            .map(|config| config.auth.clone())
            .unwrap_or_default();
        Ok(Self {
            page: resolver.dependency::<Page>("page")?,
            settings,
        })
    }
}

impl Controller for AuthController {
    fn call(
        self: Arc<Self>,
        action: &str,
        request: Request,
        _response: Response,
        _params: Params,
    ) -> BoxFuture<'static, PorticoResult<Response>> {
        match action {
            "login_form" => Box::pin(async move { self.login_form() }),
            "login" => Box::pin(async move { self.login(request).await }),
            "logout" => Box::pin(async move { Ok(self.logout()) }),
            "unauthorised" => Box::pin(async move { self.unauthorised() }),
            other => unknown_action(Self::CLASS, other),
        }
    }
}
