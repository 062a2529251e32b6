//! Anthropic messages endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::EndpointError;
use super::{finish, Endpoint, EndpointCore};
use crate::domain::models::{Completion, EndpointSettings, Turn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Endpoint speaking the Anthropic messages wire format. The system prompt
/// is a top-level `system` field, not a message; content is extracted from
/// `content[0].text`.
#[derive(Debug)]
pub struct AnthropicEndpoint {
    core: EndpointCore,
}

impl AnthropicEndpoint {
    pub const NAME: &'static str = "anthropic";

    pub fn new(settings: &EndpointSettings) -> Self {
        Self {
            core: EndpointCore::from_settings(settings),
        }
    }

    fn build_payload(&self, turns: &[Turn], system: &str) -> Value {
        let messages: Vec<Value> = turns
            .iter()
            .map(|turn| json!({"role": turn.role.as_str(), "content": turn.content}))
            .collect();

        let mut payload = json!({
            "model": self.core.model,
            "max_tokens": self.core.max_tokens,
            "messages": messages,
        });
        if !system.is_empty() {
            payload["system"] = Value::String(system.to_string());
        }
        payload
    }

    async fn request(
        &self,
        turns: &[Turn],
        system: &str,
    ) -> Result<(String, Option<Value>), EndpointError> {
        let url = format!("{}/v1/messages", self.core.base_url);
        let headers = [
            ("x-api-key", self.core.api_key.clone()),
            ("Content-Type", "application/json".to_string()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];

        let data = self
            .core
            .transport
            .post_json(Self::NAME, &url, &headers, &self.build_payload(turns, system))
            .await?;

        let content = data
            .pointer("/content/0/text")
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
impl Endpoint for AnthropicEndpoint {
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
