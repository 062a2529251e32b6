//! Remote completion endpoints.
//!
//! One [`Endpoint`] wraps one remote text-completion service (provider +
//! model + credentials) behind a uniform contract. The four provider
//! variants differ only in wire shaping; they share retry, backoff, timeout
//! clamping, and secret redaction through [`EndpointTransport`] by
//! composition.

pub mod anthropic;
pub mod error;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod transport;

use async_trait::async_trait;
use tracing::error;

use crate::domain::models::{Completion, EndpointSettings, Turn};
use crate::infrastructure::logging::redact_secrets;
use error::EndpointError;
use transport::EndpointTransport;

pub use anthropic::AnthropicEndpoint;
pub use google::GoogleEndpoint;
pub use ollama::OllamaEndpoint;
pub use openai::OpenAiEndpoint;
pub use registry::{build_council, build_endpoint, build_fixer, RegistryError};

/// One remote completion endpoint.
///
/// `complete` never returns an error for expected failure modes (network
/// trouble, non-2xx statuses, empty content) -- those are embedded in the
/// returned [`Completion`] so council fan-out can isolate them per slot.
///
/// Implementations must be `Send + Sync`; a single endpoint may serve many
/// sequential calls (the convergence loop does exactly this) and must be
/// closed by its owner when no longer needed.
#[async_trait]
pub trait Endpoint: Send + Sync + std::fmt::Debug {
    /// Stable provider name, e.g. `"anthropic"`.
    fn name(&self) -> &str;

    /// Model id this endpoint is configured with.
    fn model(&self) -> &str;

    /// Send one completion request.
    async fn complete(&self, turns: &[Turn], system: &str) -> Completion;

    /// Drop the underlying connection pool. The endpoint may be used again
    /// afterwards; a fresh pool is created lazily.
    async fn close(&self);
}

/// Resolve `${VAR}` / `${VAR:default}` placeholders against the
/// environment. Non-placeholder values pass through unchanged.
pub fn resolve_placeholder(value: &str) -> String {
    if let Some(inner) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        if let Some((var, default)) = inner.split_once(':') {
            return std::env::var(var).unwrap_or_else(|_| default.to_string());
        }
        return std::env::var(inner).unwrap_or_default();
    }
    value.to_string()
}

/// Connection-independent state shared by every endpoint variant:
/// credentials and budgets resolved from settings, plus the transport.
#[derive(Debug)]
pub struct EndpointCore {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub transport: EndpointTransport,
}

impl EndpointCore {
    /// Resolve settings into a usable core. Placeholders are resolved here,
    /// once, at construction time.
    pub fn from_settings(settings: &EndpointSettings) -> Self {
        Self {
            api_key: resolve_placeholder(&settings.api_key),
            model: resolve_placeholder(&settings.model),
            base_url: resolve_placeholder(&settings.base_url),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            transport: EndpointTransport::new(settings.timeout_secs, settings.max_retries),
        }
    }
}

/// Fold a wire-level outcome into a [`Completion`], redacting and logging
/// the error branch. Shared by every variant.
pub(crate) fn finish(
    name: &str,
    model: &str,
    outcome: Result<(String, Option<serde_json::Value>), EndpointError>,
) -> Completion {
    match outcome {
        Ok((content, usage)) => Completion::success(name, model, content, usage),
        Err(err) => {
            let message = redact_secrets(&err.to_string());
            error!(endpoint = name, error = %message, "completion failed");
            Completion::failure(name, model, message)
        }
    }
}
