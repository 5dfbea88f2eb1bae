//! Error types for the Throttle service.

use thiserror::Error;

/// Main error type for Throttle operations.
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A policy with a zero request ceiling or a zero window
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// A caller asked for a policy name that is not registered
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ThrottleError {
    fn from(err: config::ConfigError) -> Self {
        ThrottleError::Config(err.to_string())
    }
}

/// Result type alias for Throttle operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;
