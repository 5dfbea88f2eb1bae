//! Throttle service implementation.

use chrono::Utc;
use std::sync::Arc;
use tonic::metadata::MetadataValue;
use tonic::{Request, Response, Status};
use tracing::{debug, info, instrument, warn};

use super::proto::throttle_service_server::ThrottleService;
use super::proto::{
    CheckRequest, CheckResponse, ListPoliciesRequest, ListPoliciesResponse, PolicyInfo,
};
use super::RETRY_AFTER_METADATA;
use crate::ratelimit::{PolicyRegistry, RateLimiterBackend, DEFAULT_POLICY};

/// Implementation of the `throttle.v1.ThrottleService` gRPC interface.
pub struct ThrottleServiceImpl<R: RateLimiterBackend> {
    /// The rate limiter instance
    rate_limiter: Arc<R>,
    /// Named policies callers may ask for
    policies: Arc<PolicyRegistry>,
}

impl<R: RateLimiterBackend> ThrottleServiceImpl<R> {
    /// Create a new ThrottleServiceImpl with the given rate limiter and policies.
    pub fn new(rate_limiter: Arc<R>, policies: Arc<PolicyRegistry>) -> Self {
        Self {
            rate_limiter,
            policies,
        }
    }
}

#[tonic::async_trait]
impl<R: RateLimiterBackend + 'static> ThrottleService for ThrottleServiceImpl<R> {
    /// Decide whether one call may proceed.
    ///
    /// A rejection is a normal response with `success = false`; the wait is
    /// also attached as `retry-after` metadata.
    #[instrument(
        skip(self, request),
        fields(
            identifier = %request.get_ref().identifier,
            policy = %request.get_ref().policy
        )
    )]
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let req = request.into_inner();

        if req.identifier.is_empty() {
            warn!("Received check request with empty identifier");
            return Err(Status::invalid_argument("identifier is required"));
        }

        let policy_name = if req.policy.is_empty() {
            DEFAULT_POLICY
        } else {
            req.policy.as_str()
        };

        let policy = self.policies.require(policy_name).map_err(|e| {
            warn!(policy = %policy_name, "Received check request for unknown policy");
            Status::not_found(e.to_string())
        })?;

        let decision = self.rate_limiter.check(&req.identifier, &policy);

        debug!(
            success = decision.success,
            remaining = decision.remaining,
            reset_in = decision.reset_in,
            "Rate limit decision made"
        );

        let body = CheckResponse {
            success: decision.success,
            remaining: decision.remaining,
            reset_in_secs: decision.reset_in,
            limit: policy.max_requests(),
            reset_at_unix_secs: Utc::now().timestamp() + decision.reset_in as i64,
        };

        let mut response = Response::new(body);
        if !decision.success {
            response
                .metadata_mut()
                .insert(RETRY_AFTER_METADATA, MetadataValue::from(decision.reset_in));
        }

        Ok(response)
    }

    async fn list_policies(
        &self,
        _request: Request<ListPoliciesRequest>,
    ) -> Result<Response<ListPoliciesResponse>, Status> {
        let policies: Vec<PolicyInfo> = self
            .policies
            .iter()
            .map(|(name, policy)| PolicyInfo {
                name: name.to_string(),
                max_requests: policy.max_requests(),
                window_ms: policy.window_ms(),
            })
            .collect();

        info!(count = policies.len(), "Listing rate limit policies");

        Ok(Response::new(ListPoliciesResponse { policies }))
    }
}
