//! Wire messages for the `throttle.v1.ThrottleService` gRPC service.
//!
//! The service stubs (`throttle_service_server`, `throttle_service_client`)
//! are generated by `build.rs` and refer to these types.

/// Ask whether one call for `identifier` may proceed under the named policy.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CheckRequest {
    /// Caller-built key, usually `"<feature>:<user-or-address>"`
    #[prost(string, tag = "1")]
    pub identifier: String,
    /// Registered policy name; empty selects the default policy
    #[prost(string, tag = "2")]
    pub policy: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CheckResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(uint32, tag = "2")]
    pub remaining: u32,
    /// Seconds until the window resets, rounded up
    #[prost(uint64, tag = "3")]
    pub reset_in_secs: u64,
    /// Ceiling of the applied policy
    #[prost(uint32, tag = "4")]
    pub limit: u32,
    /// Wall-clock estimate of the reset, Unix seconds
    #[prost(int64, tag = "5")]
    pub reset_at_unix_secs: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListPoliciesRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PolicyInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, tag = "2")]
    pub max_requests: u32,
    #[prost(uint64, tag = "3")]
    pub window_ms: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListPoliciesResponse {
    #[prost(message, repeated, tag = "1")]
    pub policies: Vec<PolicyInfo>,
}

include!(concat!(env!("OUT_DIR"), "/throttle.v1.ThrottleService.rs"));
