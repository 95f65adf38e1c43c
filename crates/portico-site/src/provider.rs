//! Wiring of the site's controllers, services and listeners.

use std::sync::Arc;

use portico::core::controller::ControllerRegistry;
use portico::core::di::Container;
use portico::core::events::EventDispatcher;
use portico::server::ServiceProvider;
use portico::session::{NewUser, SessionError, UserLoggedIn, UserProvider, UserRegistered};

use crate::controllers::{
    AdminController, AuthController, DashboardController, HomeController, UsersController,
};
use crate::listeners::{LogUserLogin, LoginHistory, Outbox, SendWelcomeEmail, HISTORY, OUTBOX};
use crate::page::Page;

/// Accounts created at startup: `(name, email, password, roles, permissions)`.
pub const DEMO_ACCOUNTS: [(&str, &str, &str, &[&str], &[&str]); 2] = [
    (
        "Ada Admin",
        "admin@example.com",
        "admin-password",
        &["admin"],
        &["view_users", "create_users"],
    ),
    ("Una User", "user@example.com", "user-password", &["member"], &[]),
];

/// Creates the [`DEMO_ACCOUNTS`].
pub fn seed_users(users: &dyn UserProvider) -> Result<(), SessionError> {
    for (name, email, password, roles, permissions) in DEMO_ACCOUNTS {
        let user = users.create(
            NewUser::new(name, email, password)
                .roles(roles.iter().copied())
                .permissions(permissions.iter().copied()),
        )?;
        tracing::info!(user_id = user.id, email = %user.email, "demo account created");
    }
    Ok(())
}

/// Registers the site on every request container.
#[derive(Debug, Default)]
pub struct SiteProvider {
    history: Arc<LoginHistory>,
    outbox: Arc<Outbox>,
}

impl SiteProvider {
    /// A provider with an empty login history and outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The login history shared by every request.
    #[must_use]
    pub fn history(&self) -> Arc<LoginHistory> {
        Arc::clone(&self.history)
    }

    /// The mail sent by the site's listeners.
    #[must_use]
    pub fn outbox(&self) -> Arc<Outbox> {
        Arc::clone(&self.outbox)
    }
}

impl ServiceProvider for SiteProvider {
    fn register(&self, container: &Container) {
        container.instance(HISTORY, Arc::clone(&self.history));
        container.instance(OUTBOX, Arc::clone(&self.outbox));
        container.register_class::<Page>();

        container.register_controller::<HomeController>();
        container.register_controller::<AuthController>();
        container.register_controller::<DashboardController>();
        container.register_controller::<AdminController>();
        container.register_controller::<UsersController>();
    }

    fn listen(&self, events: &EventDispatcher) {
        events.add_listener(
            UserLoggedIn::NAME,
            Arc::new(LogUserLogin::new(Arc::clone(&self.history))),
        );
        events.add_listener(
            UserRegistered::NAME,
            Arc::new(SendWelcomeEmail::new(Arc::clone(&self.outbox))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico::session::InMemoryUserProvider;

    #[test]
    fn test_seed_users() {
        let users = InMemoryUserProvider::new();
        seed_users(&users).unwrap();

        let admin = users.find_by_email("admin@example.com").unwrap();
        assert!(admin.has_any_role(&["admin"]));
        assert!(admin.has_any_permission(&["view_users"]));
        assert!(admin.has_any_permission(&["create_users"]));

        let member = users.find_by_email("user@example.com").unwrap();
        assert!(!member.has_any_role(&["admin"]));
        assert!(member.permissions.is_empty());
    }

    #[test]
    fn test_seeding_twice_fails() {
        let users = InMemoryUserProvider::new();
        seed_users(&users).unwrap();
        assert!(matches!(
            seed_users(&users),
            Err(SessionError::DuplicateEmail { .. })
        ));
    }

    #[test]
    fn test_register() {
        let container = Container::new();
        SiteProvider::new().register(&container);
        for class in [
            "page",
            "HomeController",
            "AuthController",
            "DashboardController",
            "AdminController",
            "UsersController",
        ] {
            assert!(container.has_class(class), "{class} not registered");
        }
        assert!(container.has(HISTORY));
        assert!(container.has(OUTBOX));
    }

    #[test]
    fn test_listen() {
        let events = EventDispatcher::new();
        SiteProvider::new().listen(&events);
        assert!(events.has_listeners(UserLoggedIn::NAME));
        assert!(events.has_listeners(UserRegistered::NAME));
    }
}
