//! Error taxonomy for endpoint requests.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the endpoint transport and wire mapping.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Non-2xx HTTP status with the response body attached.
    #[error("http {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Connection, timeout, or body transfer failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider refused to produce content (e.g. a safety block).
    #[error("response blocked: {0}")]
    Blocked(String),

    /// HTTP success but no usable text in the response.
    #[error("empty response from endpoint")]
    EmptyResponse,
}

impl EndpointError {
    /// Whether the transport should retry after backoff.
    ///
    /// Retryable: HTTP 429, every non-4xx status (5xx and odd statuses),
    /// connect failures, and timeouts. Everything else -- including other
    /// 4xx statuses, blocked responses, and empty content -- surfaces
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                if status.is_client_error() {
                    *status == StatusCode::TOO_MANY_REQUESTS
                } else {
                    true
                }
            }
            Self::Network(err) => err.is_connect() || err.is_timeout(),
            Self::Blocked(_) | Self::EmptyResponse => false,
        }
    }
}
