//! In-memory session store.
//!
//! Entries live in a `RwLock<HashMap>`; nothing survives a restart, which
//! is fine for pending uploads whose temp files die with the process anyway.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::{Clock, SystemClock};
use super::SessionStore;
use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    created: DateTime<Utc>,
    ttl: chrono::Duration,
}

impl<V> Entry<V> {
    /// Expired iff `now > created + ttl`. A deadline past the end of time never expires.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created
            .checked_add_signed(self.ttl)
            .is_some_and(|deadline| now > deadline)
    }
}

fn poison_err<T>(_: PoisonError<T>) -> SessionError {
    SessionError::Poisoned
}

/// Thread-safe in-memory [`SessionStore`].
#[derive(Debug)]
pub struct InMemorySessionStore<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> InMemorySessionStore<V> {
    /// Create a store reading time from the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl<V> Default for InMemorySessionStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> SessionStore for InMemorySessionStore<V> {
    type Value = V;

    fn put(&self, key: &str, value: V, ttl: Duration) -> SessionResult<()> {
        let entry = Entry {
            value,
            created: self.clock.now(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        };
        self.entries
            .write()
            .map_err(poison_err)?
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> SessionResult<Option<V>> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(poison_err)?;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    fn take(&self, key: &str) -> SessionResult<Option<V>> {
        let now = self.clock.now();
        let removed = self.entries.write().map_err(poison_err)?.remove(key);
        Ok(removed
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value))
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> SessionResult<usize> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    fn len(&self) -> SessionResult<usize> {
        Ok(self.entries.read().map_err(poison_err)?.len())
    }
}
