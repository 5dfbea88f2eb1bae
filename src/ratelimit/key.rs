//! Identifier construction for rate limited subjects.

use std::fmt;
use std::net::IpAddr;

/// Who is being rate limited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    /// An authenticated user id
    User(String),
    /// Best-effort client address for anonymous callers
    Address(IpAddr),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(id) => write!(f, "{}", id),
            Subject::Address(addr) => write!(f, "{}", addr),
        }
    }
}

/// A key that scopes a rate limit to one feature and one subject.
///
/// Rendered as `"<feature>:<subject>"`, the identifier format the limiter
/// expects from request handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// The protected feature, usually the policy name
    pub feature: String,
    /// The caller
    pub subject: Subject,
}

impl RateLimitKey {
    pub fn new(feature: &str, subject: Subject) -> Self {
        Self {
            feature: feature.to_string(),
            subject,
        }
    }

    /// Key for an authenticated user.
    pub fn user(feature: &str, user_id: &str) -> Self {
        Self::new(feature, Subject::User(user_id.to_string()))
    }

    /// Key for an anonymous caller identified by address.
    pub fn address(feature: &str, addr: IpAddr) -> Self {
        Self::new(feature, Subject::Address(addr))
    }

    /// The identifier string passed to the limiter.
    pub fn to_identifier(&self) -> String {
        format!("{}:{}", self.feature, self.subject)
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_identifier())
    }
}
