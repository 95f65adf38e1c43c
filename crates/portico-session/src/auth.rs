//! Login state on top of the session.

use portico_core::di::{ContainerError, Injectable, Resolver};
use portico_core::events::{Event, EventDispatcher};
use portico_core::keys;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::SessionError;
use crate::security::Security;
use crate::session::Session;
use crate::user::{NewUser, User, UserProvider};

/// Session key holding the logged-in user id.
pub const AUTH_USER_KEY: &str = "auth_user";

/// Dispatched after a successful login.
#[derive(Debug, Clone)]
pub struct UserLoggedIn {
    /// The user who logged in.
    pub user: User,
}

impl UserLoggedIn {
    /// Event name listeners subscribe to.
    pub const NAME: &'static str = "user.logged_in";
}

impl Event for UserLoggedIn {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dispatched after an account is created through [`Auth::register`].
#[derive(Debug, Clone)]
pub struct UserRegistered {
    /// The new account.
    pub user: User,
}

impl UserRegistered {
    /// Event name listeners subscribe to.
    pub const NAME: &'static str = "user.registered";
}

impl Event for UserRegistered {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Authentication for the current request.
///
/// The logged-in user is read from the session on each call, so a login
/// performed by a controller is visible to the middleware that wraps it.
pub struct Auth {
    session: Arc<Session>,
    users: Arc<dyn UserProvider>,
    events: Option<Arc<EventDispatcher>>,
}

impl Auth {
    /// Creates the service.
    pub fn new(
        session: Arc<Session>,
        users: Arc<dyn UserProvider>,
        events: Option<Arc<EventDispatcher>>,
    ) -> Self {
        Self {
            session,
            users,
            events,
        }
    }

    /// Logs in the user with `email` if `password` matches.
    pub fn attempt(&self, email: &str, password: &str) -> bool {
        match self.users.find_by_email(email) {
            Some(user) if Security::verify_password(password, &user.password_hash) => {
                self.login(&user);
                true
            }
            _ => {
                tracing::warn!(email, "login attempt failed");
                false
            }
        }
    }

    /// Logs `user` in under a fresh session id.
    pub fn login(&self, user: &User) {
        self.session.regenerate_id();
        self.session.set(AUTH_USER_KEY, user.id);
        tracing::info!(user_id = user.id, "user logged in");

        if let Some(events) = &self.events {
            events.dispatch(&UserLoggedIn { user: user.clone() });
        }
    }

    /// Creates an account and announces it with [`UserRegistered`].
    ///
    /// The current login is left untouched.
    ///
    /// # Errors
    ///
    /// Whatever the user provider reports, such as a duplicate email.
    pub fn register(&self, user: NewUser) -> Result<User, SessionError> {
        let created = self.users.create(user)?;
        tracing::info!(user_id = created.id, by = ?self.id(), "user registered");
        if let Some(events) = &self.events {
            events.dispatch(&UserRegistered {
                user: created.clone(),
            });
        }
        Ok(created)
    }

    /// Logs the current user out.
    pub fn logout(&self) {
        if let Some(id) = self.id() {
            tracing::info!(user_id = id, "user logged out");
        }
        self.session.remove(AUTH_USER_KEY);
        self.session.regenerate_id();
    }

    /// The logged-in user.
    ///
    /// A session pointing at a user that no longer exists is cleared.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        let id = self.session.get_as::<u64>(AUTH_USER_KEY)?;
        let user = self.users.find_by_id(id);
        if user.is_none() {
            self.session.remove(AUTH_USER_KEY);
        }
        user
    }

    /// The logged-in user id.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.user().map(|user| user.id)
    }

    /// Whether a user is logged in.
    #[must_use]
    pub fn check(&self) -> bool {
        self.user().is_some()
    }

    /// Whether nobody is logged in.
    #[must_use]
    pub fn guest(&self) -> bool {
        !self.check()
    }

    /// Whether the logged-in user has any of `roles`.
    #[must_use]
    pub fn has_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.user().is_some_and(|user| user.has_any_role(roles))
    }

    /// Whether the logged-in user has any of `permissions`.
    #[must_use]
    pub fn can<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.user()
            .is_some_and(|user| user.has_any_permission(permissions))
    }
}

impl Injectable for Auth {
    const CLASS: &'static str = "auth";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let session = resolver.dependency::<Session>("session")?;
        let users = resolver.dependency_as::<Arc<dyn UserProvider>>("users", keys::USERS)?;
        let events = resolver.optional::<EventDispatcher>("events", EventDispatcher::CLASS)?;
        Ok(Self::new(session, Arc::clone(&*users), events))
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("session", &self.session)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}
