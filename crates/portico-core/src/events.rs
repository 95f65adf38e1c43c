//! Synchronous event dispatcher.
//!
//! Listeners are registered per event name and run in registration order
//! when an event with that name is dispatched. The dispatcher is a plain
//! service: it is registered in each request container and handed to the
//! components that emit events.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::di::{ContainerError, Injectable, Resolver};

/// An application event.
pub trait Event: Any + Send + Sync {
    /// The name listeners subscribe to.
    fn name(&self) -> &str;

    /// Access to the concrete event for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Receives dispatched events.
pub trait EventListener: Send + Sync {
    /// Handles one event.
    fn handle(&self, event: &dyn Event);
}

/// A listener backed by a closure.
pub struct FnListener<F>(F);

impl<F> FnListener<F>
where
    F: Fn(&dyn Event) + Send + Sync,
{
    /// Wraps a closure.
    pub const fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&dyn Event) + Send + Sync,
{
    fn handle(&self, event: &dyn Event) {
        (self.0)(event);
    }
}

/// Maps event names to listeners.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<String, Vec<Arc<dyn EventListener>>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a listener to `name`.
    pub fn add_listener(&self, name: impl Into<String>, listener: Arc<dyn EventListener>) {
        self.listeners
            .write()
            .entry(name.into())
            .or_default()
            .push(listener);
    }

    /// Runs every listener subscribed to the event's name. Returns how many ran.
    pub fn dispatch(&self, event: &dyn Event) -> usize {
        let listeners = self.listeners(event.name());
        tracing::debug!(event = event.name(), listeners = listeners.len(), "dispatching event");
        for listener in &listeners {
            listener.handle(event);
        }
        listeners.len()
    }

    /// Drops every listener subscribed to `name`.
    pub fn remove_listeners(&self, name: &str) {
        self.listeners.write().remove(name);
    }

    /// Checks whether `name` has listeners.
    #[must_use]
    pub fn has_listeners(&self, name: &str) -> bool {
        self.listeners
            .read()
            .get(name)
            .is_some_and(|list| !list.is_empty())
    }

    /// Listeners subscribed to `name`, in registration order.
    #[must_use]
    pub fn listeners(&self, name: &str) -> Vec<Arc<dyn EventListener>> {
        self.listeners.read().get(name).cloned().unwrap_or_default()
    }
}

impl Injectable for EventDispatcher {
    const CLASS: &'static str = "events";

    fn construct(_: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self::new())
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let mut names: Vec<_> = listeners.keys().collect();
        names.sort();
        f.debug_struct("EventDispatcher")
            .field("events", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct OrderPlaced {
        order_id: u64,
    }

    impl Event for OrderPlaced {
        fn name(&self) -> &str {
            "order.placed"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Arc<dyn EventListener> {
        let log = Arc::clone(log);
        Arc::new(FnListener::new(move |event: &dyn Event| {
            let id = event
                .as_any()
                .downcast_ref::<OrderPlaced>()
                .map_or(0, |e| e.order_id);
            log.lock().push(format!("{tag}:{id}"));
        }))
    }

    #[test]
    fn test_dispatch_runs_listeners_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = EventDispatcher::new();
        events.add_listener("order.placed", recorder(&log, "mail"));
        events.add_listener("order.placed", recorder(&log, "audit"));

        let ran = events.dispatch(&OrderPlaced { order_id: 7 });
        assert_eq!(ran, 2);
        assert_eq!(*log.lock(), vec!["mail:7", "audit:7"]);
    }

    #[test]
    fn test_dispatch_without_listeners() {
        let events = EventDispatcher::new();
        assert_eq!(events.dispatch(&OrderPlaced { order_id: 1 }), 0);
        assert!(!events.has_listeners("order.placed"));
    }

    #[test]
    fn test_remove_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = EventDispatcher::new();
        events.add_listener("order.placed", recorder(&log, "mail"));
        assert!(events.has_listeners("order.placed"));

        events.remove_listeners("order.placed");
        assert!(!events.has_listeners("order.placed"));
        assert!(events.listeners("order.placed").is_empty());
    }
}
