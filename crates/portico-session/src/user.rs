//! Users and where they are looked up.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::security::Security;

/// An account that can log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier stored in the session.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Login email, unique.
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Role names.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Permission names.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl User {
    /// Whether the user has any of `roles`.
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles
            .iter()
            .any(|role| self.roles.iter().any(|own| own == role.as_ref()))
    }

    /// Whether the user has any of `permissions`.
    #[must_use]
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions
            .iter()
            .any(|perm| self.permissions.iter().any(|own| own == perm.as_ref()))
    }
}

/// Fields of an account to create.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain-text password, hashed on creation.
    pub password: String,
    /// Role names.
    pub roles: Vec<String>,
    /// Permission names.
    pub permissions: Vec<String>,
}

impl NewUser {
    /// A user without roles or permissions.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Adds roles, builder style.
    pub fn roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Adds permissions, builder style.
    pub fn permissions<I: IntoIterator<Item = S>, S: Into<String>>(mut self, permissions: I) -> Self {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }
}

/// Looks users up for authentication.
pub trait UserProvider: Send + Sync + 'static {
    /// Finds a user by id.
    fn find_by_id(&self, id: u64) -> Option<User>;

    /// Finds a user by email, ignoring case.
    fn find_by_email(&self, email: &str) -> Option<User>;

    /// Creates a user, hashing the password.
    fn create(&self, user: NewUser) -> Result<User, SessionError>;

    /// Every user, in creation order.
    fn all(&self) -> Vec<User>;
}

/// Users kept in memory, shared by every request.
#[derive(Debug, Default)]
pub struct InMemoryUserProvider {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserProvider for InMemoryUserProvider {
    fn find_by_id(&self, id: u64) -> Option<User> {
        self.users.read().iter().find(|user| user.id == id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn create(&self, user: NewUser) -> Result<User, SessionError> {
        let password_hash = Security::hash_password(&user.password)?;
        let mut users = self.users.write();
        if users
            .iter()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(SessionError::DuplicateEmail { email: user.email });
        }
        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let created = User {
            id,
            name: user.name,
            email: user.email,
            password_hash,
            roles: user.roles,
            permissions: user.permissions,
        };
        users.push(created.clone());
        tracing::debug!(user_id = id, "user created");
        Ok(created)
    }

    fn all(&self) -> Vec<User> {
        self.users.read().clone()
    }
}
