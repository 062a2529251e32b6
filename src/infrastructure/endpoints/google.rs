//! Google Gemini generateContent endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::EndpointError;
use super::{finish, Endpoint, EndpointCore};
use crate::domain::models::{Completion, EndpointSettings, Role, Turn};

/// Endpoint speaking the Gemini wire format. Authentication is a `key`
/// query parameter; roles map to `user`/`model`; the system prompt becomes
/// a `systemInstruction` block; content is extracted from
/// `candidates[0].content.parts[0].text`.
#[derive(Debug)]
pub struct GoogleEndpoint {
    core: EndpointCore,
}

impl GoogleEndpoint {
    pub const NAME: &'static str = "google";

    pub fn new(settings: &EndpointSettings) -> Self {
        Self {
            core: EndpointCore::from_settings(settings),
        }
    }

    fn build_payload(&self, turns: &[Turn], system: &str) -> Value {
        let contents: Vec<Value> = turns
            .iter()
            .map(|turn| {
                let role = if turn.role == Role::User { "user" } else { "model" };
                json!({"role": role, "parts": [{"text": turn.content}]})
            })
            .collect();

        let mut payload = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.core.max_tokens,
                "temperature": self.core.temperature,
            },
        });
        if !system.is_empty() {
            payload["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        payload
    }

    async fn request(
        &self,
        turns: &[Turn],
        system: &str,
    ) -> Result<(String, Option<Value>), EndpointError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.core.base_url, self.core.model, self.core.api_key
        );

        let data = self
            .core
            .transport
            .post_json(Self::NAME, &url, &[], &self.build_payload(turns, system))
            .await?;

        let content = data
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if content.is_empty() {
            // Distinguish a safety block from a plain empty answer.
            let finish_reason = data
                .pointer("/candidates/0/finishReason")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !finish_reason.is_empty() && finish_reason != "STOP" {
                return Err(EndpointError::Blocked(finish_reason.to_string()));
            }
            return Err(EndpointError::EmptyResponse);
        }

        Ok((content, data.get("usageMetadata").cloned()))
    }
}

#[async_trait]
impl Endpoint for GoogleEndpoint {
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
