//! Per-session log feed, streamed to clients via Server-Sent Events (SSE).
//!
//! Every entry is tagged with the session it concerns and is only delivered
//! to subscribers holding that session's cookie. Entries are also emitted
//! through `tracing`, so the same messages land in the process log.

use chrono::{DateTime, Utc};
use futures::stream::Stream;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

/// Log level shown to SSE subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Session the entry belongs to. Never serialized.
    #[serde(skip)]
    pub session: Option<String>,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            session: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Tag the entry with the session it concerns.
    pub fn for_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Untagged entries are visible to nobody.
    pub fn is_visible_to(&self, session: &str) -> bool {
        self.session.as_deref() == Some(session)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a log entry to all subscribers
    pub fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info => tracing::info!("{}", entry.message),
            LogLevel::Success => tracing::info!(success = true, "{}", entry.message),
            LogLevel::Warning => tracing::warn!("{}", entry.message),
            LogLevel::Error => tracing::error!("{}", entry.message),
        }

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver of every entry, unfiltered
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    /// Entries of one session only.
    pub fn subscribe_session(&self, session: impl Into<String>) -> impl Stream<Item = LogEntry> {
        session_entries(self.subscribe(), session.into())
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter a broadcast receiver down to the entries visible to `session`.
///
/// Entries dropped because the receiver lagged are skipped.
pub fn session_entries(
    rx: broadcast::Receiver<LogEntry>,
    session: String,
) -> impl Stream<Item = LogEntry> {
    BroadcastStream::new(rx)
        .filter_map(move |result| result.ok().filter(|entry| entry.is_visible_to(&session)))
}

pub fn log_info(session: &str, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg).for_session(session));
}

pub fn log_success(session: &str, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::success(msg).for_session(session));
}

pub fn log_warning(session: &str, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg).for_session(session));
}

pub fn log_error(session: &str, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg).for_session(session));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        broadcaster.log(LogEntry::warning("slow upload"));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "slow upload");
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_value(LogEntry::success("done")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "done");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_session_tag_is_not_serialized() {
        let json = serde_json::to_value(LogEntry::info("x").for_session("secret")).unwrap();
        assert!(json.get("session").is_none());
    }

    #[test]
    fn test_untagged_entries_are_visible_to_nobody() {
        let entry = LogEntry::info("startup");
        assert!(!entry.is_visible_to(""));
        assert!(!entry.is_visible_to("abc"));
        assert!(LogEntry::info("x").for_session("abc").is_visible_to("abc"));
    }

    #[tokio::test]
    async fn test_session_streams_only_see_their_own_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut alice = Box::pin(broadcaster.subscribe_session("alice"));
        let mut bob = Box::pin(broadcaster.subscribe_session("bob"));

        broadcaster.log(LogEntry::info("Upload received: patients.csv").for_session("bob"));
        broadcaster.log(LogEntry::info("Upload received: plots.csv").for_session("alice"));
        broadcaster.log(LogEntry::info("untagged"));

        assert_eq!(alice.next().await.unwrap().message, "Upload received: plots.csv");
        assert_eq!(bob.next().await.unwrap().message, "Upload received: patients.csv");

        let nothing_more =
            tokio::time::timeout(std::time::Duration::from_millis(50), alice.next()).await;
        assert!(nothing_more.is_err());
    }
}
