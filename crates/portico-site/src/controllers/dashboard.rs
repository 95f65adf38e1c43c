//! The logged-in landing page.

use std::sync::Arc;

use portico::core::controller::{unknown_action, Controller};
use portico::core::di::{ContainerError, Injectable, Resolver};
use portico::core::types::{BoxFuture, Request, Response};
use portico::core::PorticoResult;
use portico::router::Params;
use serde_json::json;

use crate::page::Page;

/// Shows the current user's account.
#[derive(Debug)]
pub struct DashboardController {
    page: Arc<Page>,
}

impl DashboardController {
    fn index(&self) -> PorticoResult<Response> {
        let is_admin = self.page.auth().has_role(&["admin"]);
        let can_view_users = self.page.auth().can(&["view_users"]);
        self.page.render(
            "dashboard/index.html",
            json!({
                "title": "Dashboard",
                "is_admin": is_admin,
                "can_view_users": can_view_users,
            }),
        )
    }
}

impl Injectable for DashboardController {
    const CLASS: &'static str = "DashboardController";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self {
            page: resolver.dependency::<Page>("page")?,
        })
    }
}

impl Controller for DashboardController {
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
