//! Per-request session handle.

use parking_lot::Mutex;
use portico_config::{PorticoConfig, SessionConfig};
use portico_core::cookie::SetCookie;
use portico_core::di::{ContainerError, Injectable, Resolver};
use portico_core::keys;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::security::random_hex;
use crate::store::{SessionData, SessionStore};

const FLASH_KEY: &str = "flash";
const ID_BYTES: usize = 32;

#[derive(Default)]
struct State {
    id: Option<String>,
    data: SessionData,
    started: bool,
    destroyed: bool,
    stale: Vec<String>,
}

/// The session of the current request.
///
/// A session is started by the `start_session` middleware from the request
/// cookie, read and written by controllers and other middleware, and saved
/// back to the [`SessionStore`] when the response unwinds.
///
/// # Example
///
/// ```rust
/// use portico_config::SessionConfig;
/// use portico_session::{MemorySessionStore, Session};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
/// let session = Session::new(store.clone(), SessionConfig::default());
/// session.start(None);
/// session.set("theme", "dark");
/// let cookie = session.save().unwrap();
///
/// let next = Session::new(store, SessionConfig::default());
/// next.start(Some(cookie.value()));
/// assert_eq!(next.get_as::<String>("theme").as_deref(), Some("dark"));
/// ```
pub struct Session {
    store: Arc<dyn SessionStore>,
    settings: SessionConfig,
    state: Mutex<State>,
}

impl Session {
    /// Creates an unstarted session backed by `store`.
    pub fn new(store: Arc<dyn SessionStore>, settings: SessionConfig) -> Self {
        Self {
            store,
            settings,
            state: Mutex::new(State::default()),
        }
    }

    /// Starts the session. A known `cookie_id` resumes the stored data,
    /// anything else begins a fresh session under a new id.
    ///
    /// Returns `true` when an existing session was resumed. Starting twice
    /// is a no-op.
    pub fn start(&self, cookie_id: Option<&str>) -> bool {
        let mut state = self.state.lock();
        if state.started {
            return false;
        }

        let resumed = cookie_id
            .filter(|id| is_valid_id(id))
            .and_then(|id| self.store.load(id).map(|data| (id.to_string(), data)));

        state.started = true;
        state.destroyed = false;
        match resumed {
            Some((id, data)) => {
                tracing::trace!(session = %short(&id), "session resumed");
                state.id = Some(id);
                state.data = data;
                true
            }
            None => {
                state.id = Some(random_hex(ID_BYTES));
                state.data.clear();
                false
            }
        }
    }

    /// Whether [`Session::start`] has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// The current session id.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.state.lock().id.clone()
    }

    /// Name of the session cookie.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.settings.cookie_name
    }

    /// A raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().data.get(key).cloned()
    }

    /// A value deserialized into `T`.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Stores a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.lock().data.insert(key.into(), value.into());
    }

    /// Checks whether a non-null value exists.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.state
            .lock()
            .data
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    /// Removes and returns a value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.state.lock().data.remove(key)
    }

    /// Clears the data and drops the stored record. The next [`Session::save`]
    /// expires the cookie unless the session is started again.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        if let Some(id) = state.id.take() {
            state.stale.push(id);
        }
        state.data.clear();
        state.started = false;
        state.destroyed = true;
    }

    /// Moves the data to a new id; the old record is removed on save.
    ///
    /// Returns `false` if the session is not started.
    pub fn regenerate_id(&self) -> bool {
        let mut state = self.state.lock();
        if !state.started {
            return false;
        }
        let fresh = random_hex(ID_BYTES);
        if let Some(old) = state.id.replace(fresh) {
            state.stale.push(old);
        }
        true
    }

    /// Stores a message shown once.
    pub fn flash(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.state.lock();
        let flashes = state
            .data
            .entry(FLASH_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !flashes.is_object() {
            *flashes = Value::Object(Map::new());
        }
        if let Value::Object(map) = flashes {
            map.insert(key.into(), value.into());
        }
    }

    /// Gets and removes a flash message.
    pub fn take_flash(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        let Some(Value::Object(map)) = state.data.get_mut(FLASH_KEY) else {
            return None;
        };
        let value = map.remove(key);
        if map.is_empty() {
            state.data.remove(FLASH_KEY);
        }
        value
    }

    /// Checks whether a flash message exists.
    #[must_use]
    pub fn has_flash(&self, key: &str) -> bool {
        matches!(
            self.state.lock().data.get(FLASH_KEY),
            Some(Value::Object(map)) if map.contains_key(key)
        )
    }

    /// All pending flash messages, left in place.
    #[must_use]
    pub fn flashes(&self) -> Map<String, Value> {
        match self.state.lock().data.get(FLASH_KEY) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// All pending flash messages, removed.
    pub fn take_flashes(&self) -> Map<String, Value> {
        match self.state.lock().data.remove(FLASH_KEY) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Persists the session and returns the cookie to send.
    ///
    /// Returns `None` for a session that was never started, and an expiring
    /// cookie for a destroyed one.
    pub fn save(&self) -> Option<SetCookie> {
        let mut state = self.state.lock();
        for stale in state.stale.drain(..) {
            self.store.destroy(&stale);
        }

        if state.started {
            let id = state.id.clone()?;
            self.store.save(&id, &state.data);
            return Some(self.cookie(id));
        }

        state
            .destroyed
            .then(|| SetCookie::expired(self.settings.cookie_name.clone()))
    }

    fn cookie(&self, id: String) -> SetCookie {
        SetCookie::new(self.settings.cookie_name.clone(), id)
            .path("/")
            .max_age_secs(self.settings.lifetime_secs)
            .secure(self.settings.secure)
            .http_only(self.settings.http_only)
            .same_site(self.settings.same_site)
    }
}

impl Injectable for Session {
    const CLASS: &'static str = "session";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let store = resolver.dependency_as::<Arc<dyn SessionStore>>("store", keys::SESSION_STORE)?;
        let settings = resolver
            .optional::<PorticoConfig>("config", keys::CONFIG)?
            .map(|config| config.session.clone())
            .unwrap_or_default();
        Ok(Self::new(Arc::clone(&*store), settings))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("id", &state.id.as_deref().map(short))
            .field("started", &state.started)
            .field("keys", &state.data.len())
            .finish()
    }
}

fn is_valid_id(id: &str) -> bool {
    id.len() == ID_BYTES * 2 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
