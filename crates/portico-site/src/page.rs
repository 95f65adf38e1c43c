//! Shared page rendering for the site's controllers.

use std::sync::Arc;

use http::StatusCode;
use portico::core::di::{ContainerError, Injectable, Resolver};
use portico::core::keys;
use portico::core::types::Response;
use portico::core::PorticoResult;
use portico::server::View;
use portico::session::{Auth, Security, Session};
use serde_json::{Map, Value};

/// Renders templates with the layout's shared context: the current user,
/// pending flash messages and the logout form's CSRF field.
pub struct Page {
    view: Arc<View>,
    session: Arc<Session>,
    auth: Arc<Auth>,
    security: Arc<Security>,
}

impl Page {
    /// The request's session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The request's authentication state.
    #[must_use]
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// The request's security helper.
    #[must_use]
    pub fn security(&self) -> &Security {
        &self.security
    }

    /// Renders `template` with `context` and a 200 status.
    pub fn render(&self, template: &str, context: Value) -> PorticoResult<Response> {
        self.render_with(StatusCode::OK, template, context)
    }

    /// Renders `template` with `context` and `status`.
    ///
    /// Keys of `context` win over the shared ones.
    pub fn render_with(
        &self,
        status: StatusCode,
        template: &str,
        context: Value,
    ) -> PorticoResult<Response> {
        let mut shared = self.shared();
        if let Value::Object(own) = context {
            shared.extend(own);
        }
        self.view.response_with(status, template, Value::Object(shared))
    }

    fn shared(&self) -> Map<String, Value> {
        let mut shared = Map::new();
        let user = self.auth.user();
        if user.is_some() {
            shared.insert(
                "logout_field".to_string(),
                Value::String(self.security.csrf_field("logout")),
            );
        }
        shared.insert(
            "user".to_string(),
            serde_json::to_value(user).unwrap_or(Value::Null),
        );
        shared.insert(
            "flashes".to_string(),
            Value::Object(self.session.take_flashes()),
        );
        shared
    }
}

impl Injectable for Page {
    const CLASS: &'static str = "page";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self {
            view: resolver.dependency_as::<View>("view", keys::VIEW)?,
            session: resolver.dependency::<Session>("session")?,
            auth: resolver.dependency::<Auth>("auth")?,
            security: resolver.dependency::<Security>("security")?,
        })
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("view", &self.view)
            .field("session", &self.session.id())
            .finish_non_exhaustive()
    }
}
