//! Core fixed-window rate limiter.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::policy::Policy;
use super::sweeper::Sweeper;
use super::window::{ceil_secs, WindowRecord};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the call is admitted
    pub success: bool,
    /// Calls left in the current window
    pub remaining: u32,
    /// Seconds until the window resets, rounded up
    pub reset_in: u64,
}

impl Decision {
    /// How long a rejected caller should wait before retrying.
    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.reset_in)
    }
}

/// Record set shared between the limiter and its sweep task.
#[derive(Debug, Default)]
pub(crate) struct WindowStore {
    records: DashMap<String, WindowRecord>,
}

impl WindowStore {
    /// Remove every record whose window has elapsed, returning how many went.
    pub(crate) fn sweep_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

/// The fixed-window rate limiter.
///
/// Owns the per-identifier records and, when built with [`RateLimiter::start`],
/// the sweep task that reclaims expired ones. It is thread-safe and meant to
/// be shared behind an `Arc`.
pub struct RateLimiter {
    store: Arc<WindowStore>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl RateLimiter {
    /// Create a limiter without a background sweep.
    pub fn new() -> Self {
        Self {
            store: Arc::new(WindowStore::default()),
            sweeper: Mutex::new(None),
        }
    }

    /// Create a limiter and start sweeping expired windows every `sweep_interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(sweep_interval: Duration) -> Self {
        let store = Arc::new(WindowStore::default());
        let sweeper = Sweeper::spawn(Arc::downgrade(&store), sweep_interval);
        Self {
            store,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Decide whether the call identified by `identifier` is admitted under `policy`.
    ///
    /// The entry for `identifier` stays locked for the whole decision, so
    /// concurrent callers cannot both observe room under the ceiling and
    /// overshoot it.
    pub fn check(&self, identifier: &str, policy: &Policy) -> Decision {
        let now = Instant::now();
        let max_requests = policy.max_requests();

        trace!(
            identifier = %identifier,
            max_requests = max_requests,
            window_ms = policy.window_ms(),
            "Checking rate limit"
        );

        match self.store.records.entry(identifier.to_string()) {
            Entry::Occupied(mut entry) if !entry.get().is_expired(now) => {
                let record = entry.get_mut();

                if record.count >= max_requests {
                    let reset_in = record.reset_in(now);
                    debug!(
                        identifier = %identifier,
                        count = record.count,
                        reset_in = reset_in,
                        "Rate limit exceeded"
                    );
                    return Decision {
                        success: false,
                        remaining: 0,
                        reset_in,
                    };
                }

                record.count += 1;
                Decision {
                    success: true,
                    remaining: max_requests - record.count,
                    reset_in: record.reset_in(now),
                }
            }
            Entry::Occupied(mut entry) => {
                debug!(identifier = %identifier, "Rate limit window expired, starting a new one");
                entry.insert(WindowRecord::open(now, policy.window()));
                Self::fresh_window(policy)
            }
            Entry::Vacant(entry) => {
                debug!(identifier = %identifier, "Creating new rate limit window");
                entry.insert(WindowRecord::open(now, policy.window()));
                Self::fresh_window(policy)
            }
        }
    }

    fn fresh_window(policy: &Policy) -> Decision {
        Decision {
            success: true,
            remaining: policy.max_requests() - 1,
            reset_in: ceil_secs(policy.window()),
        }
    }

    /// Admitted calls in the live window for `identifier`.
    ///
    /// Returns `None` if there is no record or its window has elapsed.
    pub fn count_for(&self, identifier: &str) -> Option<u32> {
        let now = Instant::now();
        self.store
            .records
            .get(identifier)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.count)
    }

    /// Remove expired records now, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired(Instant::now())
    }

    /// Number of stored records, expired or not.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all records.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.records.clear();
    }

    /// Whether a sweep task is attached and still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|sweeper| !sweeper.is_finished())
    }

    /// Stop the sweep task, if any. Records are kept.
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            info!(records = self.len(), "Stopping rate limit sweep");
            sweeper.stop().await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("records", &self.len())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn policy(max_requests: u32, window_ms: u64) -> Policy {
        Policy::from_millis(max_requests, window_ms).unwrap()
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new();
        assert!(limiter.is_empty());
        assert!(!limiter.is_sweeping());
    }

    #[test]
    fn test_first_call_opens_window() {
        let limiter = RateLimiter::new();

        let decision = limiter.check("u1", &policy(10, 60_000));

        assert_eq!(
            decision,
            Decision {
                success: true,
                remaining: 9,
                reset_in: 60,
            }
        );
        assert_eq!(limiter.count_for("u1"), Some(1));
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_remaining_counts_down_to_zero() {
        let limiter = RateLimiter::new();
        let policy = policy(5, 60_000);

        let remaining: Vec<u32> = (0..5)
            .map(|_| {
                let decision = limiter.check("u1", &policy);
                assert!(decision.success);
                decision.remaining
            })
            .collect();

        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_rejection_does_not_change_count() {
        let limiter = RateLimiter::new();
        let policy = policy(2, 60_000);

        limiter.check("u1", &policy);
        limiter.check("u1", &policy);

        for _ in 0..3 {
            let decision = limiter.check("u1", &policy);
            assert!(!decision.success);
            assert_eq!(decision.remaining, 0);
            assert_eq!(limiter.count_for("u1"), Some(2));
        }
    }

    #[test]
    fn test_single_request_policy() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60_000);

        let first = limiter.check("u1", &policy);
        assert!(first.success);
        assert_eq!(first.remaining, 0);

        assert!(!limiter.check("u1", &policy).success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_per_minute_scenario() {
        let limiter = RateLimiter::new();
        let policy = policy(3, 60_000);

        for expected in [2, 1, 0] {
            let decision = limiter.check("u1", &policy);
            assert!(decision.success);
            assert_eq!(decision.remaining, expected);
        }

        let decision = limiter.check("u1", &policy);
        assert!(!decision.success);
        assert_eq!(decision.remaining, 0);

        tokio::time::advance(Duration::from_millis(60_001)).await;

        let decision = limiter.check("u1", &policy);
        assert!(decision.success);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_exactly_at_boundary() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 1_000);

        limiter.check("u1", &policy);
        for _ in 0..10 {
            assert!(!limiter.check("u1", &policy).success);
        }

        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert_eq!(limiter.count_for("u1"), None);

        let decision = limiter.check("u1", &policy);
        assert!(decision.success);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_in, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_in_never_increases_within_window() {
        let limiter = RateLimiter::new();
        let policy = policy(100, 10_000);

        let mut last = limiter.check("u1", &policy).reset_in;
        assert_eq!(last, 10);

        for _ in 0..19 {
            tokio::time::advance(Duration::from_millis(499)).await;
            let reset_in = limiter.check("u1", &policy).reset_in;
            assert!(reset_in <= last);
            last = reset_in;
        }
        assert_eq!(last, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_reports_time_left() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60_000);

        limiter.check("u1", &policy);
        tokio::time::advance(Duration::from_millis(45_500)).await;

        let decision = limiter.check("u1", &policy);
        assert!(!decision.success);
        assert_eq!(decision.reset_in, 15);
        assert_eq!(decision.retry_after(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_near_window_end_waits_one_second() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60_000);

        limiter.check("u1", &policy);
        tokio::time::advance(Duration::from_micros(59_999_500)).await;

        let decision = limiter.check("u1", &policy);
        assert!(!decision.success);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_in, 1);
        assert_eq!(limiter.count_for("u1"), Some(1));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new();
        let policy = policy(3, 60_000);

        for _ in 0..3 {
            assert!(limiter.check("user-a", &policy).success);
        }
        assert!(!limiter.check("user-a", &policy).success);

        let decision = limiter.check("user-b", &policy);
        assert!(decision.success);
        assert_eq!(decision.remaining, 2);
        assert_eq!(limiter.count_for("user-a"), Some(3));
        assert_eq!(limiter.count_for("user-b"), Some(1));
    }

    #[test]
    fn test_concurrent_checks_never_overshoot() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = policy(50, 60_000);

        let admitted: u32 = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    scope.spawn(move || {
                        (0..100)
                            .filter(|_| limiter.check("shared", &policy).success)
                            .count() as u32
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 50);
        assert_eq!(limiter.count_for("shared"), Some(50));
    }

    #[test]
    fn test_concurrent_identifiers_do_not_interfere() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = policy(10, 60_000);

        thread::scope(|scope| {
            for worker in 0..4 {
                let limiter = Arc::clone(&limiter);
                scope.spawn(move || {
                    let identifier = format!("user-{}", worker);
                    for _ in 0..10 {
                        assert!(limiter.check(&identifier, &policy).success);
                    }
                    assert!(!limiter.check(&identifier, &policy).success);
                });
            }
        });

        assert_eq!(limiter.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired_removes_only_elapsed_windows() {
        let limiter = RateLimiter::new();

        limiter.check("short", &policy(5, 1_000));
        limiter.check("long", &policy(5, 60_000));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.count_for("long"), Some(1));
    }

    #[test]
    fn test_clear_records() {
        let limiter = RateLimiter::new();
        limiter.check("u1", &policy(5, 60_000));
        assert_eq!(limiter.len(), 1);

        limiter.clear();
        assert!(limiter.is_empty());
    }
}
