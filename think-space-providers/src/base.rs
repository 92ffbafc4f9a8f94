//! Base trait for LLM providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use think_space_core::session::{ChatMessage, Role};

/// Upstream error codes that mean the requested model cannot be served
const MODEL_UNAVAILABLE_CODES: &[&str] = &["model_not_found", "model_decommissioned"];

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The upstream answered with a non-success status
    #[error("{message}")]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Whether the upstream rejected the request because the model is unknown or retired.
    ///
    /// Uses the structured error code when the upstream sends one. Otherwise
    /// falls back to matching the message text, which is fragile and only
    /// kept for upstreams that return free-form errors.
    pub fn is_model_unavailable(&self) -> bool {
        if let ProviderError::ApiError {
            code: Some(code), ..
        } = self
        {
            if MODEL_UNAVAILABLE_CODES.contains(&code.as_str()) {
                return true;
            }
        }
        mentions_unavailable_model(&self.to_string())
    }
}

fn mentions_unavailable_model(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("model") && (lower.contains("not found") || lower.contains("decommissioned"))
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: HashMap<String, i64>,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

/// A message in the chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<LLMResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: Option<&str>, message: &str) -> ProviderError {
        ProviderError::ApiError {
            status: 400,
            code: code.map(ToString::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_structured_code_marks_model_unavailable() {
        assert!(api_error(Some("model_decommissioned"), "gone").is_model_unavailable());
        assert!(api_error(Some("model_not_found"), "nope").is_model_unavailable());
    }

    #[test]
    fn test_message_heuristic_marks_model_unavailable() {
        let err = api_error(
            None,
            "The model `llama3-70b-8192` has been decommissioned and is no longer supported",
        );
        assert!(err.is_model_unavailable());
        assert!(api_error(None, "Model Not Found").is_model_unavailable());
    }

    #[test]
    fn test_other_errors_are_not_model_unavailable() {
        assert!(!api_error(Some("rate_limit_exceeded"), "Rate limit reached").is_model_unavailable());
        // "model" alone is not enough.
        assert!(!api_error(None, "model overloaded").is_model_unavailable());
        assert!(!ProviderError::InvalidResponse("not found".into()).is_model_unavailable());
    }

    #[test]
    fn test_message_serializes_openai_shape() {
        let value = serde_json::to_value(Message::system("be brief")).unwrap();
        assert_eq!(value, serde_json::json!({"role": "system", "content": "be brief"}));
    }
}
