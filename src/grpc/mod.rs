//! gRPC surface of the throttle service.

pub mod proto;
mod server;
mod service;

pub use server::GrpcServer;
pub use service::ThrottleServiceImpl;

// Re-export commonly used types
pub use proto::throttle_service_client::ThrottleServiceClient;
pub use proto::throttle_service_server::{ThrottleService, ThrottleServiceServer};
pub use proto::{
    CheckRequest, CheckResponse, ListPoliciesRequest, ListPoliciesResponse, PolicyInfo,
};

/// Metadata key carrying the wait, in seconds, on a rejected check.
pub const RETRY_AFTER_METADATA: &str = "retry-after";
