//! OpenAI-style chat completions endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::EndpointError;
use super::{finish, Endpoint, EndpointCore};
use crate::domain::models::{Completion, EndpointSettings, Turn};

/// Endpoint speaking the OpenAI chat-completions wire format. The system
/// prompt travels as a leading `system` message; content is extracted from
/// `choices[0].message.content`.
#[derive(Debug)]
pub struct OpenAiEndpoint {
    core: EndpointCore,
}

impl OpenAiEndpoint {
    pub const NAME: &'static str = "openai";

    pub fn new(settings: &EndpointSettings) -> Self {
        Self {
            core: EndpointCore::from_settings(settings),
        }
    }

    fn build_payload(&self, turns: &[Turn], system: &str) -> Value {
        let mut messages: Vec<Value> = Vec::with_capacity(turns.len() + 1);
        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in turns {
            messages.push(json!({"role": turn.role.as_str(), "content": turn.content}));
        }

        json!({
            "model": self.core.model,
            "messages": messages,
            "max_tokens": self.core.max_tokens,
            "temperature": self.core.temperature,
        })
    }

    async fn request(
        &self,
        turns: &[Turn],
        system: &str,
    ) -> Result<(String, Option<Value>), EndpointError> {
        let url = format!("{}/chat/completions", self.core.base_url);
        let headers = [
            ("Authorization", format!("Bearer {}", self.core.api_key)),
            ("Content-Type", "application/json".to_string()),
        ];

        let data = self
            .core
            .transport
            .post_json(Self::NAME, &url, &headers, &self.build_payload(turns, system))
            .await?;

        let content = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if content.is_empty() {
            return Err(EndpointError::EmptyResponse);
        }

        Ok((content, data.get("usage").cloned()))
    }
}

#[async_trait]
impl Endpoint for OpenAiEndpoint {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn model(&self) -> &str {
        &self.core.model
    }

    async fn complete(&self, turns: &[Turn], system: &str) -> Completion {
        finish(Self::NAME, &self.core.model, self.request(turns, system).await)
    }

    async fn close(&self) {
        self.core.transport.close().await;
    }
}
