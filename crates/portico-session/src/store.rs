//! Session persistence.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// The key-value data of one session.
pub type SessionData = HashMap<String, Value>;

/// Where sessions live between requests.
///
/// One store is shared by every request, so implementations must be
/// `Send + Sync`.
pub trait SessionStore: Send + Sync + 'static {
    /// Loads the data of `id`, or `None` for an unknown or expired session.
    fn load(&self, id: &str) -> Option<SessionData>;

    /// Writes the data of `id`, refreshing its lifetime.
    fn save(&self, id: &str, data: &SessionData);

    /// Forgets `id`.
    fn destroy(&self, id: &str);

    /// Drops every expired session and returns how many were removed.
    ///
    /// The server calls this periodically. Stores that expire records on
    /// their own can keep the default.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Writes between the sweeps [`MemorySessionStore`] runs on its own.
const SWEEP_EVERY: usize = 256;

struct Record {
    data: SessionData,
    touched: Instant,
}

/// An in-process store whose records expire after an idle lifetime.
///
/// Expired records are dropped when loaded, by [`SessionStore::purge_expired`]
/// and by a sweep every few hundred writes, so sessions that are never
/// resumed do not pile up.
///
/// # Example
///
/// ```rust
/// use portico_session::{MemorySessionStore, SessionData, SessionStore};
/// use std::time::Duration;
///
/// let store = MemorySessionStore::new(Duration::from_secs(60));
/// let mut data = SessionData::new();
/// data.insert("theme".into(), "dark".into());
/// store.save("abc", &data);
///
/// assert_eq!(store.load("abc").unwrap()["theme"], "dark");
/// store.destroy("abc");
/// assert!(store.load("abc").is_none());
/// ```
pub struct MemorySessionStore {
    records: DashMap<String, Record>,
    lifetime: Duration,
    writes: AtomicUsize,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            records: DashMap::new(),
            lifetime,
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &str) -> Option<SessionData> {
        {
            let record = self.records.get(id)?;
            if record.touched.elapsed() < self.lifetime {
                return Some(record.data.clone());
            }
        }
        // The read guard must be gone before removing.
        self.records.remove(id);
        None
    }

    fn save(&self, id: &str, data: &SessionData) {
        self.records.insert(
            id.to_string(),
            Record {
                data: data.clone(),
                touched: Instant::now(),
            },
        );
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }
    }

    fn destroy(&self, id: &str) {
        self.records.remove(id);
    }

    fn purge_expired(&self) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| record.touched.elapsed() < self.lifetime);
        before.saturating_sub(self.records.len())
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("sessions", &self.records.len())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
