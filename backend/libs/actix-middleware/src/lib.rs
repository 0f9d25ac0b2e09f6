//! # Actix Middleware Library
//!
//! Shared middleware components for the vocl HTTP services
//!
//! ## Modules
//! - `rate_limit`: in-memory fixed-window rate limiting

pub mod rate_limit;

pub use rate_limit::{
    RateLimitConfig, RateLimitDecision, RateLimitIdentity, RateLimitMiddleware, RateLimiter,
};
