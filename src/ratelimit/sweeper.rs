//! Background reclamation of expired windows.
//!
//! Expired records are already treated as absent by the limiter, so the
//! sweep only bounds memory. It holds a weak reference to the store and
//! exits once the store is gone.

use std::sync::Weak;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::limiter::WindowStore;

/// How often expired windows are swept when no interval is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Handle to a running sweep task.
pub(crate) struct Sweeper {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn the sweep task on the current Tokio runtime.
    pub(crate) fn spawn(store: Weak<WindowStore>, period: Duration) -> Self {
        // interval_at panics on a zero period
        let period = period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else {
                            break;
                        };
                        let removed = store.sweep_expired(Instant::now());
                        debug!(
                            removed = removed,
                            remaining = store.len(),
                            "Swept expired rate limit windows"
                        );
                    }
                }
            }

            debug!("Rate limit sweep stopped");
        });

        info!(interval_secs = period.as_secs(), "Rate limit sweep started");

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Signal the task to exit and wait for it.
    pub(crate) async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{Policy, RateLimiter};

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_reclaims_expired_windows() {
        let limiter = RateLimiter::start(Duration::from_secs(300));
        let policy = Policy::per_minute(10).unwrap();

        limiter.check("ai-suggestion:u1", &policy);
        limiter.check("ai-suggestion:u2", &policy);
        assert!(limiter.is_sweeping());

        // Expired but not yet swept.
        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(limiter.len(), 2);
        assert_eq!(limiter.count_for("ai-suggestion:u1"), None);

        tokio::time::advance(Duration::from_secs(240)).await;
        settle().await;
        assert!(limiter.is_empty());

        limiter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_live_windows() {
        let limiter = RateLimiter::start(Duration::from_secs(5));
        let policy = Policy::per_minute(10).unwrap();

        limiter.check("u1", &policy);

        tokio::time::advance(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(limiter.count_for("u1"), Some(1));

        limiter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweep() {
        let limiter = RateLimiter::start(Duration::from_secs(1));
        limiter.check("u1", &Policy::from_millis(1, 500).unwrap());

        limiter.shutdown().await;
        assert!(!limiter.is_sweeping());

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(limiter.len(), 1);

        // A second shutdown is a no-op.
        limiter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_exits_when_store_dropped() {
        let store = std::sync::Arc::new(WindowStore::default());
        let sweeper = Sweeper::spawn(std::sync::Arc::downgrade(&store), Duration::from_secs(1));

        drop(store);
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;

        assert!(sweeper.is_finished());
    }
}
