use serde::{Deserialize, Serialize};
use std::sync::Arc;
use think_space_agent::CompletionRelay;
use think_space_core::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<CompletionRelay>,
}

impl AppState {
    pub fn new(relay: Arc<CompletionRelay>) -> Self {
        Self { relay }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.relay.sessions()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainstormRequest {
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainstormResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub client_ready: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub message: String,
    pub groq_client: String,
    pub sessions_count: usize,
}
