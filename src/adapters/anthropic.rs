//! Anthropic Messages API model client.
//!
//! Non-streaming calls only: the loop awaits the full response anyway.
//! Transient transport failures (network errors, 429, 5xx) are retried
//! with bounded exponential backoff before the error reaches the loop.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::domain::errors::ModelError;
use crate::domain::models::{ModelConfig, Prompt, RetryConfig};
use crate::domain::ports::{ModelClient, ModelCompletion};

/// System prompt content block with an ephemeral prompt-cache marker. The
/// system prompt is stable across a run's rounds, so subsequent calls get
/// served from cache.
#[derive(Debug, Serialize)]
struct SystemContentBlock {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: String,
    cache_control: CacheControl,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    control_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<SystemContentBlock>>,
    messages: Vec<Message>,
}

/// Usage information from the API.
#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Content block in a response message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

/// `ModelClient` backed by the Anthropic Messages API.
pub struct AnthropicClient {
    config: ModelConfig,
    retry: RetryConfig,
    client: Client,
}

impl AnthropicClient {
    pub fn new(config: ModelConfig, retry: RetryConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ModelError::Transport(format!("failed to create HTTP client: {err}")))?;
        Ok(Self { config, retry, client })
    }

    /// API key from config, falling back to the environment.
    fn api_key(&self) -> Result<String, ModelError> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or(ModelError::MissingApiKey)
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.retry.initial_backoff_ms),
            max_interval: Duration::from_millis(self.retry.max_backoff_ms),
            max_elapsed_time: Some(Duration::from_millis(
                self.retry.max_backoff_ms * u64::from(self.retry.max_retries),
            )),
            ..ExponentialBackoff::default()
        }
    }

    fn build_request(&self, prompt: &Prompt, max_tokens: u32) -> MessagesRequest {
        let system = if prompt.system.is_empty() {
            None
        } else {
            Some(vec![SystemContentBlock {
                block_type: "text",
                text: prompt.system.clone(),
                cache_control: CacheControl { control_type: "ephemeral" },
            }])
        };

        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens,
            system,
            messages: vec![Message { role: "user", content: prompt.user.clone() }],
        }
    }

    async fn send_once(
        &self,
        api_key: &str,
        request: &MessagesRequest,
    ) -> Result<ModelCompletion, ModelError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(request)
            .send()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status: status.as_u16(), body });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(err.to_string()))?;

        let text = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ModelCompletion {
            text,
            prompt_tokens: parsed.usage.input_tokens,
            completion_tokens: parsed.usage.output_tokens,
        })
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn invoke(
        &self,
        prompt: &Prompt,
        max_tokens: u32,
    ) -> Result<ModelCompletion, ModelError> {
        let api_key = self.api_key()?;
        let request = self.build_request(prompt, max_tokens);

        retry(self.backoff_policy(), || async {
            match self.send_once(&api_key, &request).await {
                Ok(completion) => Ok(completion),
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "transient model API failure, retrying");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        let config = ModelConfig { api_key: Some("test-key".into()), ..ModelConfig::default() };
        AnthropicClient::new(config, RetryConfig::default()).unwrap()
    }

    #[test]
    fn test_build_request_with_system_prompt() {
        let prompt = Prompt { system: "You write tests.".into(), user: "Go.".into() };
        let request = client().build_request(&prompt, 1024);
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "Go.");
        assert!(request.system.is_some());
    }

    #[test]
    fn test_build_request_empty_system_is_omitted() {
        let prompt = Prompt { system: String::new(), user: "Go.".into() };
        let request = client().build_request(&prompt, 64);
        assert!(request.system.is_none());
    }

    #[test]
    fn test_api_key_prefers_config() {
        assert_eq!(client().api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_request_serializes_cache_control() {
        let prompt = Prompt { system: "sys".into(), user: "usr".into() };
        let request = client().build_request(&prompt, 64);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_deserializes_text_blocks() {
        let body = r#"{
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "new_tests: []"},
                {"type": "tool_use", "id": "t", "name": "n", "input": {}}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content.len(), 2);
        assert_eq!(parsed.usage.input_tokens, 10);
        assert!(matches!(&parsed.content[0], ContentBlock::Text { text } if text == "new_tests: []"));
        assert!(matches!(&parsed.content[1], ContentBlock::Other));
    }
}
