//! Rate limit policies and the named policy registry.
//!
//! A policy is the ceiling applied to one protected operation: how many
//! requests a single identifier may make within one fixed window. The
//! registry maps operation names (`ai-suggestion`, `auth`, ...) to policies
//! and can be extended from a YAML file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, ThrottleError};

/// Policy applied when a caller does not name one.
pub const DEFAULT_POLICY: &str = "default";

/// Built-in presets: name, max requests, window in milliseconds.
const PRESETS: &[(&str, u32, u64)] = &[
    ("ai-suggestion", 10, 60_000),
    ("ats-score", 5, 60_000),
    ("auth", 5, 900_000),
    (DEFAULT_POLICY, 60, 60_000),
];

/// Throttle ceiling for a protected operation.
///
/// Construction rejects a zero ceiling and a sub-millisecond window, so every
/// `Policy` that reaches the limiter admits at least one request per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    max_requests: u32,
    window: Duration,
}

impl Policy {
    /// Create a validated policy. Windows are whole milliseconds or longer.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(ThrottleError::InvalidPolicy(
                "max_requests must be at least 1".to_string(),
            ));
        }
        if window < Duration::from_millis(1) {
            return Err(ThrottleError::InvalidPolicy(
                "window must be at least 1ms".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    /// Create a policy from a window given in milliseconds.
    pub fn from_millis(max_requests: u32, window_ms: u64) -> Result<Self> {
        Self::new(max_requests, Duration::from_millis(window_ms))
    }

    /// `max_requests` per sixty seconds.
    pub fn per_minute(max_requests: u32) -> Result<Self> {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

/// Serialized form of a policy in the policies file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl TryFrom<PolicyRule> for Policy {
    type Error = ThrottleError;

    fn try_from(rule: PolicyRule) -> Result<Self> {
        Policy::from_millis(rule.max_requests, rule.window_ms)
    }
}

impl From<Policy> for PolicyRule {
    fn from(policy: Policy) -> Self {
        Self {
            max_requests: policy.max_requests,
            window_ms: policy.window_ms(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policies: BTreeMap<String, PolicyRule>,
}

/// Named policies consumed by request handlers.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, Policy>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in presets.
    pub fn builtin() -> Self {
        let policies = PRESETS
            .iter()
            .map(|&(name, max_requests, window_ms)| {
                let policy = Policy {
                    max_requests,
                    window: Duration::from_millis(window_ms),
                };
                (name.to_string(), policy)
            })
            .collect();
        Self { policies }
    }

    /// Load policies from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit policies");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load policies from a YAML string. Every entry is validated.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: PolicyFile = serde_yaml::from_str(yaml)
            .map_err(|e| ThrottleError::Config(format!("Failed to parse policies: {}", e)))?;

        let mut registry = Self::new();
        for (name, rule) in file.policies {
            let policy = Policy::try_from(rule).map_err(|e| match e {
                ThrottleError::InvalidPolicy(reason) => {
                    ThrottleError::InvalidPolicy(format!("policy '{}': {}", name, reason))
                }
                other => other,
            })?;
            registry.insert(name, policy);
        }
        Ok(registry)
    }

    /// Add or replace a policy.
    pub fn insert(&mut self, name: impl Into<String>, policy: Policy) {
        self.policies.insert(name.into(), policy);
    }

    /// Overlay `other` on this registry; entries in `other` win.
    pub fn merge(&mut self, other: PolicyRegistry) {
        self.policies.extend(other.policies);
    }

    pub fn get(&self, name: &str) -> Option<Policy> {
        self.policies.get(name).copied()
    }

    /// Look up a policy, failing for unregistered names.
    pub fn require(&self, name: &str) -> Result<Policy> {
        self.get(name)
            .ok_or_else(|| ThrottleError::UnknownPolicy(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Policy)> {
        self.policies.iter().map(|(name, policy)| (name.as_str(), *policy))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// The table in its serialized form.
    pub fn to_rules(&self) -> BTreeMap<String, PolicyRule> {
        self.iter()
            .map(|(name, policy)| (name.to_string(), PolicyRule::from(policy)))
            .collect()
    }
}
