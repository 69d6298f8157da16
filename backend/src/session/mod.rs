//! Pending-upload sessions.
//!
//! An upload is staged to a temp file and parked under a random session key
//! until the client picks its fixed columns. Each entry expires `ttl` after
//! it was stored; a ticker task sweeps expired entries and dropping an entry
//! deletes its staged file.
//!
//! - [`SessionStore`] - storage capability (`put`, `get`, `take`, `sweep_expired`)
//! - [`InMemorySessionStore`] - `RwLock<HashMap>` implementation
//! - [`Clock`] - injected time source ([`SystemClock`], [`ManualClock`])
//! - [`PendingUpload`] - what a session holds
//! - [`spawn_sweeper`] - periodic expiry task

pub mod clock;
pub mod memory;
pub mod pending;
pub mod sweeper;

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::SessionResult;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::InMemorySessionStore;
pub use pending::PendingUpload;
pub use sweeper::spawn_sweeper;

/// Name of the cookie carrying the session key.
pub const SESSION_COOKIE: &str = "tableconverter-session";

/// Key-value storage with per-entry time to live.
///
/// An entry stored at `created` is expired once `now > created + ttl`.
/// Expired entries are never returned, whether or not they were swept yet.
pub trait SessionStore: Send + Sync {
    type Value;

    /// Store `value` under `key`, replacing any previous entry.
    fn put(&self, key: &str, value: Self::Value, ttl: Duration) -> SessionResult<()>;

    /// Live value for `key`.
    fn get(&self, key: &str) -> SessionResult<Option<Self::Value>>;

    /// Remove `key`, returning its value if it was still live.
    fn take(&self, key: &str) -> SessionResult<Option<Self::Value>>;

    /// Drop every entry expired at `now`. Returns how many were dropped.
    fn sweep_expired(&self, now: DateTime<Utc>) -> SessionResult<usize>;

    /// Number of stored entries, expired-but-unswept ones included.
    fn len(&self) -> SessionResult<usize>;

    fn is_empty(&self) -> SessionResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Generate a fresh session key.
pub fn new_session_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
