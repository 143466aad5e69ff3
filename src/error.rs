//! Fault taxonomy for the gateway boundary.
//!
//! The orchestrator's retry policy keys off these variants: connectivity
//! loss backs off for a long interval, timeouts and everything else for a
//! short one. Per-asset faults are handled locally by the components and
//! never reach the retry loop.

use thiserror::Error;

/// Error returned by any external gateway call.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The remote host could not be reached at all.
    #[error("network unreachable: {0}")]
    Connectivity(String),

    /// The request was sent but no response arrived in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The remote service answered with an error.
    #[error("api error: {0}")]
    Api(String),

    /// The response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_connect() {
            GatewayError::Connectivity(err.to_string())
        } else if err.is_decode() {
            GatewayError::Parse(err.to_string())
        } else {
            GatewayError::Api(err.to_string())
        }
    }
}
