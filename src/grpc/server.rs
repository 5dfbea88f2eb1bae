//! gRPC server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

use super::proto::throttle_service_server::ThrottleServiceServer;
use super::service::ThrottleServiceImpl;
use crate::error::{Result, ThrottleError};
use crate::ratelimit::{PolicyRegistry, RateLimiterBackend};

/// gRPC server for the throttle service.
pub struct GrpcServer<R: RateLimiterBackend + 'static> {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    rate_limiter: Arc<R>,
    /// Policies exposed to callers
    policies: Arc<PolicyRegistry>,
}

impl<R: RateLimiterBackend + 'static> GrpcServer<R> {
    /// Create a new gRPC server.
    pub fn new(addr: SocketAddr, rate_limiter: Arc<R>, policies: Arc<PolicyRegistry>) -> Self {
        Self {
            addr,
            rate_limiter,
            policies,
        }
    }

    fn service(&self) -> ThrottleServiceServer<ThrottleServiceImpl<R>> {
        ThrottleServiceServer::new(ThrottleServiceImpl::new(
            Arc::clone(&self.rate_limiter),
            Arc::clone(&self.policies),
        ))
    }

    /// Start the gRPC server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        info!(
            addr = %self.addr,
            policies = self.policies.len(),
            "Starting gRPC server for ThrottleService"
        );

        Server::builder()
            .add_service(self.service())
            .serve_with_shutdown(self.addr, signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                ThrottleError::Grpc(e)
            })
    }

    /// Serve on an already bound listener, ignoring the configured address.
    pub async fn serve_on_listener<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Starting gRPC server for ThrottleService on bound listener");

        Server::builder()
            .add_service(self.service())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                ThrottleError::Grpc(e)
            })
    }
}
