//! Rate limiting logic and state management.

mod backend;
mod key;
mod limiter;
mod policy;
mod sweeper;
mod window;

pub use backend::RateLimiterBackend;
pub use key::{RateLimitKey, Subject};
pub use limiter::{Decision, RateLimiter};
pub use policy::{Policy, PolicyRegistry, PolicyRule, DEFAULT_POLICY};
pub use sweeper::DEFAULT_SWEEP_INTERVAL;
pub use window::WindowRecord;
