//! Turns dispatch errors into error pages.

use http::StatusCode;
use portico_core::types::{Response, ResponseExt};
use portico_core::PorticoError;
use portico_session::Security;
use portico_telemetry::record_error;
use serde_json::json;
use std::error::Error as _;
use std::sync::Arc;

use crate::view::View;

/// Template rendered for error pages outside debug mode.
pub const ERROR_TEMPLATE: &str = "errors/error.html";

/// Renders errors that escaped the middleware chain.
///
/// In debug mode the page shows the error kind, message and source chain.
/// Otherwise it shows a generic message through [`ERROR_TEMPLATE`], falling
/// back to a built-in page when the template is missing or fails.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    debug: bool,
    view: Arc<View>,
}

impl ErrorHandler {
    /// Creates a handler.
    pub fn new(debug: bool, view: Arc<View>) -> Self {
        Self { debug, view }
    }

    /// Whether detailed pages are rendered.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Logs `err` and renders it with its status.
    pub fn render(&self, err: &PorticoError) -> Response {
        let status = err.status_code();
        tracing::error!(
            kind = err.kind(),
            status = status.as_u16(),
            error = %err,
            "request failed"
        );
        record_error(err.kind());
        self.page(status, err)
    }

    /// Renders the page for a request no route matched.
    pub fn not_found(&self, err: &PorticoError) -> Response {
        tracing::info!(error = %err, "no route matched");
        self.page(StatusCode::NOT_FOUND, err)
    }

    fn page(&self, status: StatusCode, err: &PorticoError) -> Response {
        if self.debug {
            return Response::html(status, debug_page(status, err));
        }

        let message = if status == StatusCode::NOT_FOUND {
            "Page not found"
        } else {
            "An error occurred"
        };
        let context = json!({
            "title": format!("Error {}", status.as_u16()),
            "status": status.as_u16(),
            "message": message,
        });
        let body = match self.view.render_optional(ERROR_TEMPLATE, context) {
            Ok(Some(body)) => body,
            Ok(None) => generic_page(status, message),
            Err(render_err) => {
                tracing::warn!(error = %render_err, "error template failed to render");
                generic_page(status, message)
            }
        };
        Response::html(status, body)
    }
}

fn generic_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Error {code}</title></head>\
         <body><h1>Error {code}</h1><p>{message}</p></body></html>",
        code = status.as_u16()
    )
}

fn debug_page(status: StatusCode, err: &PorticoError) -> String {
    let mut sources = String::new();
    let mut source = err.source();
    while let Some(cause) = source {
        sources.push_str("<li>");
        sources.push_str(&Security::sanitize(&cause.to_string()));
        sources.push_str("</li>");
        source = cause.source();
    }
    if sources.is_empty() {
        sources.push_str("<li>none</li>");
    }

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{kind}</title>\
         <style>body{{font-family:sans-serif;margin:2em}}.kind{{color:#c0392b}}\
         pre{{background:#f5f5f5;padding:1em}}</style></head>\
         <body><h1 class=\"kind\">{kind}</h1><p>Status {code}</p><pre>{message}</pre>\
         <h3>Caused by</h3><ol>{sources}</ol></body></html>",
        kind = err.kind(),
        code = status.as_u16(),
        message = Security::sanitize(&err.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::di::ContainerError;
    use portico_core::types::body_text;

    fn handler(debug: bool) -> ErrorHandler {
        ErrorHandler::new(debug, Arc::new(View::empty("Test")))
    }

    #[tokio::test]
    async fn test_generic_pages() {
        let response = handler(false).render(&PorticoError::internal("db down"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("An error occurred"));
        assert!(!body.contains("db down"));

        let response = handler(false).render(&PorticoError::action_not_found("users", "nope"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn test_custom_status() {
        let err = PorticoError::http(StatusCode::FORBIDDEN, "Invalid CSRF token");
        let response = handler(false).render(&err);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_debug_page_shows_details() {
        let err = PorticoError::from(ContainerError::BindingNotFound {
            key: "<missing>".to_string(),
        });
        let response = handler(true).render(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("BindingNotFound"));
        assert!(body.contains("&lt;missing&gt;"));
        assert!(!body.contains("<missing>"));
    }

    #[tokio::test]
    async fn test_debug_page_lists_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = PorticoError::internal_with_source("save failed", io);
        let body = body_text(handler(true).render(&err)).await;
        assert!(body.contains("save failed"));
        assert!(body.contains("disk full"));
    }

    #[tokio::test]
    async fn test_error_template_is_used() {
        let mut view = View::empty("Test");
        view.add_template(ERROR_TEMPLATE, "{{ title }}: {{ message }}")
            .unwrap();
        let handler = ErrorHandler::new(false, Arc::new(view));

        let err = PorticoError::route_not_found("GET", "/nowhere");
        let response = handler.not_found(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Error 404: Page not found");
    }
}
