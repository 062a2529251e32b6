//! Ollama local chat endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::EndpointError;
use super::{finish, Endpoint, EndpointCore};
use crate::domain::models::{Completion, EndpointSettings, Turn};

/// Endpoint speaking the Ollama chat wire format. No authentication; the
/// system prompt travels as a leading `system` message; content is
/// extracted from `message.content`. Ollama reports no usage statistics.
#[derive(Debug)]
pub struct OllamaEndpoint {
    core: EndpointCore,
}

impl OllamaEndpoint {
    pub const NAME: &'static str = "ollama";

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
            "stream": false,
            "options": {
                "num_predict": self.core.max_tokens,
                "temperature": self.core.temperature,
            },
        })
    }

    async fn request(
        &self,
        turns: &[Turn],
        system: &str,
    ) -> Result<(String, Option<Value>), EndpointError> {
        let url = format!("{}/api/chat", self.core.base_url);

        let data = self
            .core
            .transport
            .post_json(Self::NAME, &url, &[], &self.build_payload(turns, system))
            .await?;

        let content = data
            .pointer("/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if content.is_empty() {
            return Err(EndpointError::EmptyResponse);
        }

        Ok((content, None))
    }
}

#[async_trait]
impl Endpoint for OllamaEndpoint {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_disables_streaming() {
        let endpoint = OllamaEndpoint::new(&EndpointSettings {
            model: "llama3.2".to_string(),
            base_url: "http://localhost:11434".to_string(),
            max_tokens: 512,
            ..Default::default()
        });
        let payload = endpoint.build_payload(&[Turn::user("hi")], "be brief");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["num_predict"], 512);
        assert_eq!(payload["messages"][0]["role"], "system");
    }
}
