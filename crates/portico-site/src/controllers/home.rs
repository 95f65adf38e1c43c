//! Public pages.

use std::sync::Arc;

use portico::core::controller::{unknown_action, Controller};
use portico::core::di::{ContainerError, Injectable, Resolver};
use portico::core::types::{BoxFuture, Request, Response};
use portico::core::PorticoResult;
use portico::router::Params;
use serde_json::json;

use crate::page::Page;

/// The home and about pages.
#[derive(Debug)]
pub struct HomeController {
    page: Arc<Page>,
}

impl HomeController {
    fn index(&self) -> PorticoResult<Response> {
        self.page.render(
            "home/index.html",
            json!({
                "title": "Home",
                "content": "Welcome to the Portico demonstration site",
            }),
        )
    }

    fn about(&self) -> PorticoResult<Response> {
        self.page.render(
            "home/about.html",
            json!({
                "title": "About",
                "content": "A members site built on a small MVC framework",
            }),
        )
    }
}

impl Injectable for HomeController {
    const CLASS: &'static str = "HomeController";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self {
            page: resolver.dependency::<Page>("page")?,
        })
    }
}

impl Controller for HomeController {
    fn call(
        self: Arc<Self>,
        action: &str,
        _request: Request,
        _response: Response,
        _params: Params,
    ) -> BoxFuture<'static, PorticoResult<Response>> {
        match action {
            "index" => Box::pin(async move { self.index() }),
            "about" => Box::pin(async move { self.about() }),
            other => unknown_action(Self::CLASS, other),
        }
    }
}
