//! Template rendering.
//!
//! [`View`] is a thin adapter over a `minijinja` environment that loads
//! templates from a directory on first use. Files ending in `.html` are
//! auto-escaped.
//!
//! # Example
//!
//! ```rust
//! use portico_server::View;
//! use serde_json::json;
//!
//! let mut view = View::empty("Demo");
//! view.add_template("hello.html", "<h1>{{ app_name }}: {{ name }}</h1>").unwrap();
//!
//! let html = view.render("hello.html", json!({ "name": "<World>" })).unwrap();
//! assert_eq!(html, "<h1>Demo: &lt;World&gt;</h1>");
//! ```

use http::StatusCode;
use minijinja::{path_loader, Environment, ErrorKind};
use portico_core::types::{Response, ResponseExt};
use portico_core::{PorticoError, PorticoResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Renders named templates.
pub struct View {
    env: Environment<'static>,
    root: Option<PathBuf>,
}

impl View {
    /// A view loading templates from `root`. The directory is read lazily.
    pub fn from_path(root: impl AsRef<Path>, app_name: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut env = Self::environment(app_name);
        env.set_loader(path_loader(&root));
        Self {
            env,
            root: Some(root),
        }
    }

    /// A view with no template directory, for templates added in code.
    pub fn empty(app_name: &str) -> Self {
        Self {
            env: Self::environment(app_name),
            root: None,
        }
    }

    fn environment(app_name: &str) -> Environment<'static> {
        let mut env = Environment::new();
        env.add_global("app_name", app_name.to_string());
        env
    }

    /// Registers a template from source.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> PorticoResult<()> {
        let name = name.into();
        self.env
            .add_template_owned(name.clone(), source.into())
            .map_err(|e| PorticoError::internal_with_source(format!("Invalid template '{name}'"), e))
    }

    /// The template directory, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Whether `name` can be loaded.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Renders `name` with `context`.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> PorticoResult<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(|e| {
                PorticoError::internal_with_source(format!("Failed to render template '{name}'"), e)
            })
    }

    /// Renders `name`, or returns `None` when no such template exists.
    pub fn render_optional<S: Serialize>(
        &self,
        name: &str,
        context: S,
    ) -> PorticoResult<Option<String>> {
        match self.env.get_template(name) {
            Ok(template) => template.render(context).map(Some).map_err(|e| {
                PorticoError::internal_with_source(format!("Failed to render template '{name}'"), e)
            }),
            Err(e) if matches!(e.kind(), ErrorKind::TemplateNotFound) => Ok(None),
            Err(e) => Err(PorticoError::internal_with_source(
                format!("Failed to load template '{name}'"),
                e,
            )),
        }
    }

    /// Renders `name` into a `200 OK` HTML response.
    pub fn response<S: Serialize>(&self, name: &str, context: S) -> PorticoResult<Response> {
        self.response_with(StatusCode::OK, name, context)
    }

    /// Renders `name` into an HTML response with `status`.
    pub fn response_with<S: Serialize>(
        &self,
        status: StatusCode,
        name: &str,
        context: S,
    ) -> PorticoResult<Response> {
        Ok(Response::html(status, self.render(name, context)?))
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("errors")).unwrap();
        fs::write(dir.path().join("index.html"), "Hi {{ user }}").unwrap();
        fs::write(dir.path().join("errors/404.html"), "missing: {{ message }}").unwrap();

        let view = View::from_path(dir.path(), "Test");
        assert_eq!(view.root(), Some(dir.path()));
        assert_eq!(view.render("index.html", json!({ "user": "ann" })).unwrap(), "Hi ann");
        assert_eq!(
            view.render("errors/404.html", json!({ "message": "gone" })).unwrap(),
            "missing: gone"
        );
    }

    #[test]
    fn test_missing_template() {
        let view = View::empty("Test");
        assert!(!view.exists("nope.html"));
        assert!(view.render_optional("nope.html", json!({})).unwrap().is_none());

        let err = view.render("nope.html", json!({})).unwrap_err();
        assert_eq!(err.kind(), "InternalError");
    }

    #[test]
    fn test_response_is_html() {
        let mut view = View::empty("Test");
        view.add_template("page.html", "{{ app_name }}").unwrap();
        let response = view.response("page.html", json!({})).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }
}
