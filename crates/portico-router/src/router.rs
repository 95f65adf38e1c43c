//! Ordered route table.

use http::Method;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::RouterError;
use crate::params::Params;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// A registered route.
///
/// The path pattern is compiled once, when the route is created: literal
/// text is matched as-is, each `{name}` placeholder captures one non-empty
/// segment, the match is anchored at both ends and ignores case.
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    controller: String,
    action: String,
    method: Method,
    middleware: Vec<String>,
    pattern: Regex,
    names: Vec<String>,
}

impl Route {
    /// Compiles a route.
    pub fn new(
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
        method: Method,
        middleware: Vec<String>,
    ) -> Result<Self, RouterError> {
        let path = path.into();
        let (pattern, names) = compile(&path)?;
        Ok(Self {
            path,
            controller: controller.into(),
            action: action.into(),
            method,
            middleware,
            pattern,
            names,
        })
    }

    /// The path pattern as registered.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The controller identifier.
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// The action name.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Middleware references attached to the route.
    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    /// Matches a request, returning the captured parameters.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> Option<Params> {
        if &self.method != method {
            return None;
        }
        let captures = self.pattern.captures(path)?;
        let mut params = Params::new();
        for (name, value) in self.names.iter().zip(captures.iter().skip(1)) {
            params.push(name.as_str(), value.map_or("", |m| m.as_str()));
        }
        Some(params)
    }
}

fn compile(path: &str) -> Result<(Regex, Vec<String>), RouterError> {
    let mut source = String::from("(?i)^");
    let mut names = Vec::new();
    let mut last = 0;

    for captures in placeholder().captures_iter(path) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        source.push_str(&regex::escape(&path[last..whole.start()]));
        source.push_str("([^/]+)");
        names.push(name.as_str().to_string());
        last = whole.end();
    }
    source.push_str(&regex::escape(&path[last..]));
    source.push('$');

    let pattern = Regex::new(&source).map_err(|source| RouterError::InvalidPattern {
        pattern: path.to_string(),
        source,
    })?;
    Ok((pattern, names))
}

/// The result of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Controller identifier.
    pub controller: String,
    /// Action name.
    pub action: String,
    /// Captured parameters, in path order.
    pub params: Params,
    /// Middleware references of the route.
    pub middleware: Vec<String>,
}

/// Routes in registration order; the first match wins.
///
/// # Example
///
/// ```rust
/// use portico_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.add("/users", "users", "index", Method::GET, vec!["web".into()]).unwrap();
/// router.add("/users/{id}", "users", "show", Method::GET, vec!["web".into()]).unwrap();
///
/// let found = router.resolve(&Method::GET, "/users/42").unwrap();
/// assert_eq!(found.action, "show");
/// assert_eq!(found.params.get(0), Some("42"));
/// assert!(router.resolve(&Method::GET, "/users/").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Duplicate paths are allowed; later ones are only
    /// reached when earlier ones do not match.
    pub fn add(
        &mut self,
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
        method: Method,
        middleware: Vec<String>,
    ) -> Result<&mut Self, RouterError> {
        self.routes
            .push(Route::new(path, controller, action, method, middleware)?);
        Ok(self)
    }

    /// Appends an already compiled route.
    pub fn push(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    /// Finds the first route matching `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, RouterError> {
        self.routes
            .iter()
            .find_map(|route| {
                route.matches(method, path).map(|params| RouteMatch {
                    controller: route.controller.clone(),
                    action: route.action.clone(),
                    params,
                    middleware: route.middleware.clone(),
                })
            })
            .ok_or_else(|| RouterError::NotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }

    /// Registered routes in order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
