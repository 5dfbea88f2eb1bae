//! Throttle - Fixed-Window Rate Limiting Service
//!
//! This crate implements the in-memory fixed-window rate limiter that guards
//! the AI-suggestion, ATS-score and authentication endpoints of the resume
//! builder. Handlers either link the limiter directly or ask the gRPC
//! service before running a protected operation.

pub mod config;
pub mod error;
pub mod grpc;
pub mod ratelimit;
