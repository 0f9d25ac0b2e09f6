//! Shared error payloads and message sanitization for vocl services
//!
//! Every HTTP error leaves a service as an [`ErrorResponse`]. In production
//! the message first goes through [`sanitize_error_message`] so database and
//! infrastructure details never reach clients.

pub mod sanitize;

pub use sanitize::{sanitize_error_message, GENERIC_ERROR_MESSAGE};

use serde::{Deserialize, Serialize};

/// JSON error body: `{"error": "...", "status": 400}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, status: u16) -> Self {
        Self {
            error: error.into(),
            status,
        }
    }

    /// Build a response whose message is sanitized when `production` is set
    pub fn sanitized(error: &str, status: u16, production: bool) -> Self {
        Self::new(sanitize_error_message(error, production), status)
    }
}
