//! Middleware registration, expansion and execution.

use portico_core::di::Container;
use portico_core::types::{Request, Response};
use portico_core::{PorticoError, PorticoResult};
use std::collections::HashMap;
use std::sync::Arc;

use crate::middleware::Next;
use crate::reference::{split_arguments, MiddlewareEntry, MiddlewareRef};

/// Holds the global list, named groups and aliases, and turns route tags
/// into a running chain.
///
/// # Example
///
/// ```rust
/// use portico_middleware::{MiddlewareEntry, MiddlewareManager};
///
/// let mut manager = MiddlewareManager::new();
/// manager.add_route("auth", "authenticate");
/// manager.add_route("role", "require_role");
/// manager.add_group("web", vec!["start_session"]);
/// manager.add_group("admin", vec!["web", "auth", "role:admin"]);
///
/// let entries = manager.resolve_middleware(&"admin".into()).unwrap();
/// let labels: Vec<_> = entries.iter().map(MiddlewareEntry::label).collect();
/// assert_eq!(labels, vec!["start_session", "authenticate", "require_role:admin"]);
/// ```
#[derive(Debug, Default)]
pub struct MiddlewareManager {
    global: Vec<MiddlewareRef>,
    groups: HashMap<String, Vec<MiddlewareRef>>,
    aliases: HashMap<String, MiddlewareRef>,
}

impl MiddlewareManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the list applied to every request.
    pub fn add(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.global.push(middleware.into());
        self
    }

    /// Registers (or replaces) a named group.
    pub fn add_group<I, M>(&mut self, name: impl Into<String>, members: I) -> &mut Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.groups
            .insert(name.into(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Registers (or replaces) a route alias.
    pub fn add_route(&mut self, name: impl Into<String>, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.aliases.insert(name.into(), middleware.into());
        self
    }

    /// Checks whether a group exists.
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Checks whether an alias exists.
    #[must_use]
    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Expands a reference into a flat, ordered list of entries.
    ///
    /// Fails with [`PorticoError::MiddlewareCycle`] when a group or alias
    /// reaches itself.
    pub fn resolve_middleware(&self, reference: &MiddlewareRef) -> PorticoResult<Vec<MiddlewareEntry>> {
        let mut entries = Vec::new();
        self.expand(reference, &mut Vec::new(), &mut entries)?;
        Ok(entries)
    }

    /// Expands route tags in order.
    pub fn resolve_tags(&self, tags: &[String]) -> PorticoResult<Vec<MiddlewareEntry>> {
        let mut entries = Vec::new();
        let mut visiting = Vec::new();
        for tag in tags {
            self.expand(&MiddlewareRef::Name(tag.clone()), &mut visiting, &mut entries)?;
        }
        Ok(entries)
    }

    /// Runs `middleware`, preceded by the global list, around `target`.
    ///
    /// The chain is folded from the right: the first entry is the
    /// outermost layer and `target` the innermost call.
    pub async fn run(
        &self,
        container: Arc<Container>,
        request: Request,
        response: Response,
        middleware: Vec<MiddlewareEntry>,
        target: Next,
    ) -> PorticoResult<Response> {
        let mut chain = self.resolve_middleware(&MiddlewareRef::List(self.global.clone()))?;
        chain.extend(middleware);

        tracing::debug!(
            chain = ?chain.iter().map(MiddlewareEntry::label).collect::<Vec<_>>(),
            "running middleware chain"
        );

        let next = chain.into_iter().rev().fold(target, |next, entry| {
            Next::link(entry, Arc::clone(&container), next)
        });
        next.run(request, response).await
    }

    fn expand(
        &self,
        reference: &MiddlewareRef,
        visiting: &mut Vec<String>,
        out: &mut Vec<MiddlewareEntry>,
    ) -> PorticoResult<()> {
        match reference {
            MiddlewareRef::Callable(middleware) => {
                out.push(MiddlewareEntry::Callable(Arc::clone(middleware)));
            }
            MiddlewareRef::List(items) => {
                for item in items {
                    self.expand(item, visiting, out)?;
                }
            }
            MiddlewareRef::Name(name) => {
                if let Some(members) = self.groups.get(name) {
                    enter(visiting, name)?;
                    for member in members {
                        self.expand(member, visiting, out)?;
                    }
                    visiting.pop();
                    return Ok(());
                }

                let (alias, arguments) = split_arguments(name);
                if let Some(target) = self.aliases.get(alias) {
                    enter(visiting, alias)?;
                    let start = out.len();
                    self.expand(target, visiting, out)?;
                    visiting.pop();
                    if !arguments.is_empty() {
                        attach_arguments(&mut out[start..], &arguments);
                    }
                    return Ok(());
                }

                out.push(MiddlewareEntry::Class {
                    class: alias.to_string(),
                    arguments,
                });
            }
        }
        Ok(())
    }
}

fn enter(visiting: &mut Vec<String>, name: &str) -> PorticoResult<()> {
    if visiting.iter().any(|seen| seen == name) {
        let mut chain = visiting.clone();
        chain.push(name.to_string());
        return Err(PorticoError::MiddlewareCycle { chain });
    }
    visiting.push(name.to_string());
    Ok(())
}

fn attach_arguments(entries: &mut [MiddlewareEntry], arguments: &[String]) {
    for entry in entries {
        if let MiddlewareEntry::Class { arguments: existing, .. } = entry {
            if existing.is_empty() {
                existing.extend_from_slice(arguments);
            }
        }
    }
}
