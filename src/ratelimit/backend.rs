//! Rate limiter trait for abstracting the limiter behind the gRPC service.

use std::sync::Arc;

use super::limiter::{Decision, RateLimiter};
use super::policy::Policy;

/// Trait for rate limiter implementations.
///
/// The gRPC service is generic over this trait so it can be exercised with
/// any limiter that makes the same admit/reject decision.
pub trait RateLimiterBackend: Send + Sync {
    /// Check and record one call for `identifier` under `policy`.
    fn check(&self, identifier: &str, policy: &Policy) -> Decision;
}

impl RateLimiterBackend for RateLimiter {
    fn check(&self, identifier: &str, policy: &Policy) -> Decision {
        RateLimiter::check(self, identifier, policy)
    }
}

impl<R: RateLimiterBackend + ?Sized> RateLimiterBackend for Arc<R> {
    fn check(&self, identifier: &str, policy: &Policy) -> Decision {
        (**self).check(identifier, policy)
    }
}
