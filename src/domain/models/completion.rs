//! Conversation turns and per-endpoint completion results.

use serde::{Deserialize, Serialize};

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by OpenAI-style and Ollama chat APIs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation sent to an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Outcome of one completion request against one endpoint.
///
/// Expected failures never surface as `Err` from
/// [`Endpoint::complete`](crate::infrastructure::endpoints::Endpoint::complete);
/// they are carried here so a council dispatch always yields one result per
/// endpoint. Invariant: `error.is_none()` iff the call succeeded, and
/// `content` is empty whenever `error` is set.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Name of the endpoint that produced this result (e.g. "anthropic").
    pub endpoint: String,
    /// Model id the endpoint was configured with.
    pub model: String,
    /// Generated text; empty on failure.
    pub content: String,
    /// Failure description, already redacted of secrets.
    pub error: Option<String>,
    /// Provider-shaped usage statistics, when the endpoint reports them.
    pub usage: Option<serde_json::Value>,
}

impl Completion {
    /// Build a successful completion.
    pub fn success(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
        usage: Option<serde_json::Value>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            content: content.into(),
            error: None,
            usage,
        }
    }

    /// Build a failed completion. Content is always empty.
    pub fn failure(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            content: String::new(),
            error: Some(error.into()),
            usage: None,
        }
    }

    /// True when the request succeeded.
    pub const fn ok(&self) -> bool {
        self.error.is_none()
    }
}
