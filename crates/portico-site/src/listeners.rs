//! Event listeners.

use std::sync::Arc;

use parking_lot::Mutex;
use portico::core::events::{Event, EventListener};
use portico::session::{UserLoggedIn, UserRegistered};
use serde::Serialize;

/// Container key of the shared [`LoginHistory`].
pub const HISTORY: &str = "login_history";

/// Container key of the shared [`Outbox`].
pub const OUTBOX: &str = "outbox";

const HISTORY_LIMIT: usize = 20;
const OUTBOX_LIMIT: usize = 50;

/// One successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRecord {
    /// Id of the user.
    pub user_id: u64,
    /// Their email at the time of login.
    pub email: String,
}

/// The most recent logins, newest first.
#[derive(Debug, Default)]
pub struct LoginHistory {
    records: Mutex<Vec<LoginRecord>>,
}

impl LoginHistory {
    /// Records a login, dropping the oldest past the limit.
    pub fn push(&self, record: LoginRecord) {
        let mut records = self.records.lock();
        records.insert(0, record);
        records.truncate(HISTORY_LIMIT);
    }

    /// The recorded logins, newest first.
    #[must_use]
    pub fn recent(&self) -> Vec<LoginRecord> {
        self.records.lock().clone()
    }
}

/// Logs each login and adds it to the [`LoginHistory`].
#[derive(Debug)]
pub struct LogUserLogin {
    history: Arc<LoginHistory>,
}

impl LogUserLogin {
    /// Creates the listener.
    pub const fn new(history: Arc<LoginHistory>) -> Self {
        Self { history }
    }
}

impl EventListener for LogUserLogin {
    fn handle(&self, event: &dyn Event) {
        let Some(login) = event.as_any().downcast_ref::<UserLoggedIn>() else {
            return;
        };
        tracing::debug!(user_id = login.user.id, email = %login.user.email, "login recorded");
        self.history.push(LoginRecord {
            user_id: login.user.id,
            email: login.user.email.clone(),
        });
    }
}

/// A message the site would have mailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

/// Mail is not delivered; messages are logged and kept here, newest first.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<Email>>,
}

impl Outbox {
    /// Keeps `email`, dropping the oldest past the limit.
    pub fn send(&self, email: Email) {
        tracing::info!(to = %email.to, subject = %email.subject, "email queued");
        let mut sent = self.sent.lock();
        sent.insert(0, email);
        sent.truncate(OUTBOX_LIMIT);
    }

    /// Messages sent so far, newest first.
    #[must_use]
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().clone()
    }
}

/// Greets every new account by email.
#[derive(Debug)]
pub struct SendWelcomeEmail {
    outbox: Arc<Outbox>,
}

impl SendWelcomeEmail {
    /// Subject of the welcome message.
    pub const SUBJECT: &'static str = "Welcome to our site";

    /// Creates the listener.
    pub const fn new(outbox: Arc<Outbox>) -> Self {
        Self { outbox }
    }
}

impl EventListener for SendWelcomeEmail {
    fn handle(&self, event: &dyn Event) {
        let Some(registered) = event.as_any().downcast_ref::<UserRegistered>() else {
            return;
        };
        let user = &registered.user;
        self.outbox.send(Email {
            to: user.email.clone(),
            subject: Self::SUBJECT.to_string(),
            body: format!(
                "Hello {},\n\nYour account is ready. Sign in with {}.",
                user.name, user.email
            ),
        });
    }
}
