use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Minimal client for a running think-space server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct BrainstormReply {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    detail: String,
}

impl ApiClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn brainstorm(&self, prompt: &str, session_id: Option<&str>) -> Result<BrainstormReply> {
        let url = format!("{}/brainstorm", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "prompt": prompt, "session_id": session_id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorReply>(&text)
                .map(|e| e.detail)
                .unwrap_or(text);
            anyhow::bail!("Server returned {}: {}", status, detail);
        }

        Ok(response.json().await?)
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<String> {
        let url = format!("{}/clear-session", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await?
            .error_for_status()?;

        let reply: MessageReply = response.json().await?;
        Ok(reply.message)
    }
}
