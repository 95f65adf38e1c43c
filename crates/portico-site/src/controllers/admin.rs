//! The admin area.

use std::sync::Arc;

use portico::config::PorticoConfig;
use portico::core::controller::{unknown_action, Controller};
use portico::core::di::{ContainerError, Injectable, Resolver};
use portico::core::keys;
use portico::core::types::{BoxFuture, Request, Response};
use portico::core::PorticoResult;
use portico::router::Params;
use portico::session::UserProvider;
use serde_json::json;

use crate::listeners::{LoginHistory, Outbox, HISTORY, OUTBOX};
use crate::page::Page;

/// Site overview for administrators.
pub struct AdminController {
    page: Arc<Page>,
    config: Arc<PorticoConfig>,
    users: Arc<dyn UserProvider>,
    history: Arc<LoginHistory>,
    outbox: Arc<Outbox>,
}

impl AdminController {
    fn index(&self) -> PorticoResult<Response> {
        self.page.render(
            "admin/index.html",
            json!({
                "title": "Administration",
                "user_count": self.users.all().len(),
                "environment": self.config.app.env,
                "debug": self.config.app.debug,
                "logins": self.history.recent(),
                "emails": self.outbox.sent(),
            }),
        )
    }
}

impl Injectable for AdminController {
    const CLASS: &'static str = "AdminController";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let users = resolver.dependency_as::<Arc<dyn UserProvider>>("users", keys::USERS)?;
        Ok(Self {
            page: resolver.dependency::<Page>("page")?,
            config: resolver.dependency_as::<PorticoConfig>("config", keys::CONFIG)?,
            users: Arc::clone(&*users),
            history: resolver.dependency_as::<LoginHistory>("history", HISTORY)?,
            outbox: resolver.dependency_as::<Outbox>("outbox", OUTBOX)?,
        })
    }
}

impl Controller for AdminController {
    fn call(
        self: Arc<Self>,
        action: &str,
        _request: Request,
        _response: Response,
        _params: Params,
    ) -> BoxFuture<'static, PorticoResult<Response>> {
        match action {
            "index" => Box::pin(async move { self.index() }),
            other => unknown_action(Self::CLASS, other),
        }
    }
}
