//! Periodic eviction of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clock::Clock;
use super::SessionStore;

/// Spawn a task that calls [`SessionStore::sweep_expired`] every `every`.
///
/// The first sweep happens one full interval after spawning. Abort the
/// returned handle to stop the task.
pub fn spawn_sweeper<S>(store: Arc<S>, clock: Arc<dyn Clock>, every: Duration) -> JoinHandle<()>
where
    S: SessionStore + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.sweep_expired(clock.now()) {
                Ok(0) => {}
                Ok(evicted) => tracing::info!(evicted, "Evicted expired upload sessions"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}
