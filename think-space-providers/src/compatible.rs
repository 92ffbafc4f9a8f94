//! OpenAI-compatible chat-completions HTTP client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
use crate::registry::ProviderRegistry;

/// Chat-completions request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

/// Chat-completions response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

/// Error envelope returned by OpenAI-compatible APIs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Client for any provider speaking the OpenAI chat-completions protocol
pub struct CompatibleClient {
    client: Client,
    api_base: String,
    api_key: String,
    default_model: String,
}

impl CompatibleClient {
    /// Create a new client.
    ///
    /// When `api_base` is empty or unset, the registry default for
    /// `provider_name` is used.
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: impl Into<String>,
        provider_name: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .or_else(|| {
                ProviderRegistry::new()
                    .find_by_name(provider_name)
                    .map(|spec| spec.default_api_base.clone())
                    .filter(|base| !base.is_empty())
            })
            .ok_or_else(|| {
                ProviderError::ConfigError(format!(
                    "no api_base configured and no default known for provider '{}'",
                    provider_name
                ))
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: default_model.into(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Parse a chat-completions response into our standard format
    fn parse_response(response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        let mut usage = HashMap::new();
        usage.insert("prompt_tokens".to_string(), response.usage.prompt_tokens);
        usage.insert(
            "completion_tokens".to_string(),
            response.usage.completion_tokens,
        );
        usage.insert("total_tokens".to_string(), response.usage.total_tokens);

        Ok(LLMResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }

    /// Turn a non-success body into an `ApiError`, keeping the upstream message raw.
    fn parse_error(status: u16, body: &str) -> ProviderError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => ProviderError::ApiError {
                status,
                code: envelope.error.code,
                message: envelope.error.message,
            },
            Err(_) => ProviderError::ApiError {
                status,
                code: None,
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl LLMProvider for CompatibleClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatCompletionRequest {
            model: &model,
            messages: &messages,
            max_tokens,
            temperature,
        };

        debug!(
            "Sending chat request to {} with model {} ({} messages)",
            self.api_base,
            model,
            messages.len()
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::parse_error(status.as_u16(), &error_text));
        }

        let response_data: ChatCompletionResponse = response.json().await?;
        Self::parse_response(response_data)
    }
}
