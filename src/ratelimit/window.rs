//! Fixed-window record kept per identifier.

use std::time::Duration;
use tokio::time::Instant;

/// Requests observed for one identifier in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// Admitted requests in this window
    pub count: u32,
    /// When the window ends
    pub reset_at: Instant,
}

impl WindowRecord {
    /// Open a fresh window containing one request.
    pub fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    /// A record whose window has elapsed counts as absent.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn reset_in(&self, now: Instant) -> u64 {
        ceil_secs(self.reset_at.saturating_duration_since(now))
    }
}

/// Round a duration up to whole seconds; any time left counts as a second.
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    duration.as_nanos().div_ceil(1_000_000_000) as u64
}
