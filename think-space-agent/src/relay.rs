//! Completion relay: one conversational turn against the upstream model

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use think_space_core::config::ProviderConfig;
use think_space_core::session::{ChatMessage, Role, SessionManager, TurnGuard};
use think_space_providers::{CompatibleClient, LLMProvider, ProviderError, ProviderRegistry};

use crate::prompt::build_messages;

const PROMPT_PREVIEW_CHARS: usize = 50;

/// Failures surfaced by the relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// No credential was configured at start; the relay is disabled
    #[error("Missing API key: set environment variable {key}")]
    NotConfigured { key: String },

    /// The upstream rejected the model name as unknown or retired
    #[error("Model '{model}' is not available. Error: {message}")]
    ModelUnavailable { model: String, message: String },

    /// Any other upstream failure, carrying the raw upstream message
    #[error("Server error: {0}")]
    Upstream(String),

    #[error("Prompt must not be empty")]
    InvalidPrompt,

    #[error("Server error: {0}")]
    Session(#[from] think_space_core::Error),
}

/// Fixed parameters for every upstream call
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub provider_name: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key_env: String,
}

impl From<&ProviderConfig> for RelaySettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            provider_name: config.name.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key_env: config.api_key_env.clone(),
        }
    }
}

/// Result of a successful turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainstormReply {
    pub response: String,
    pub session_id: String,
}

/// Forwards prompts upstream with the fixed system prompt and session history
pub struct CompletionRelay {
    provider: Option<Arc<dyn LLMProvider>>,
    sessions: Arc<SessionManager>,
    settings: RelaySettings,
    provider_label: String,
}

impl CompletionRelay {
    /// Create a relay. A `None` provider leaves the relay permanently disabled.
    pub fn new(
        provider: Option<Arc<dyn LLMProvider>>,
        sessions: Arc<SessionManager>,
        settings: RelaySettings,
    ) -> Self {
        let provider_label = ProviderRegistry::new().label_for(&settings.provider_name);
        Self {
            provider,
            sessions,
            settings,
            provider_label,
        }
    }

    /// Build the relay from provider configuration read at start.
    pub fn from_config(config: &ProviderConfig, sessions: Arc<SessionManager>) -> Self {
        let settings = RelaySettings::from(config);
        info!("API key present: {}", config.api_key().is_some());

        let provider: Option<Arc<dyn LLMProvider>> = match config.api_key() {
            None => {
                warn!(
                    "No API key found in {}; completion relay disabled",
                    config.api_key_env
                );
                None
            }
            Some(key) => match CompatibleClient::new(
                key,
                config.api_base.clone(),
                config.model.clone(),
                &config.name,
                Duration::from_secs(config.timeout_secs),
            ) {
                Ok(client) => {
                    info!("{} client initialized ({})", config.name, client.api_base());
                    Some(Arc::new(client) as Arc<dyn LLMProvider>)
                }
                Err(e) => {
                    error!("Failed to initialize {} client: {}", config.name, e);
                    None
                }
            },
        };

        Self::new(provider, sessions, settings)
    }

    /// Whether an upstream client is available
    pub fn is_ready(&self) -> bool {
        self.provider.is_some()
    }

    /// Model name sent upstream
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Display name of the upstream provider
    pub fn provider_label(&self) -> &str {
        &self.provider_label
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Run one turn: resolve the session, call upstream with the full transcript,
    /// and record the exchange.
    ///
    /// Turns on the same session run one at a time. History only changes when
    /// the upstream call succeeds.
    pub async fn brainstorm(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<BrainstormReply, RelayError> {
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        info!("Brainstorm request received: {}...", preview);

        let Some(provider) = self.provider.as_ref() else {
            error!("Completion client not initialized");
            return Err(RelayError::NotConfigured {
                key: self.settings.api_key_env.clone(),
            });
        };

        if prompt.trim().is_empty() {
            return Err(RelayError::InvalidPrompt);
        }

        let (turn, history) = self.open_turn(session_id).await?;
        let session_id = turn.session_id().to_string();
        let messages = build_messages(&history, prompt);

        info!(
            "Using model {} with {} prior messages",
            self.settings.model,
            history.len()
        );

        let response = provider
            .chat(
                messages,
                Some(self.settings.model.clone()),
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await
            .map_err(|e| self.classify(e))?;

        let reply = response
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                error!("Upstream returned an empty completion");
                RelayError::Upstream("empty response from upstream model".to_string())
            })?;
        info!("Reply received: {} characters", reply.chars().count());

        let recorded = self
            .sessions
            .append(&session_id, Role::User, prompt)
            .and_then(|_| self.sessions.append(&session_id, Role::Assistant, reply.as_str()));
        if let Err(e) = recorded {
            // Session was cleared while the turn was in flight.
            warn!("Turn not recorded for session {}: {}", session_id, e);
        }

        Ok(BrainstormReply {
            response: reply,
            session_id,
        })
    }

    /// Remove a session. Returns false when the id is unknown.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id)
    }

    /// Resolve the session and wait for its turn lock.
    ///
    /// A session cleared while this request was queued is replaced by a fresh
    /// one, the same as an unknown id.
    async fn open_turn(
        &self,
        session_id: Option<&str>,
    ) -> Result<(TurnGuard, Vec<ChatMessage>), RelayError> {
        let mut requested = session_id;
        loop {
            let (session_id, is_new) = self.sessions.resolve(requested);
            if is_new {
                info!("Started session {}", session_id);
            }

            let opened = match self.sessions.lock_turn(&session_id).await {
                Ok(turn) => self
                    .sessions
                    .history(&session_id)
                    .map(|history| (turn, history)),
                Err(e) => Err(e),
            };

            match opened {
                Ok(opened) => return Ok(opened),
                Err(e) if e.is_not_found() => {
                    warn!("Session {} was cleared before its turn started", session_id);
                    requested = None;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn classify(&self, err: ProviderError) -> RelayError {
        error!("Upstream completion failed: {:?}", err);
        if err.is_model_unavailable() {
            RelayError::ModelUnavailable {
                model: self.settings.model.clone(),
                message: err.to_string(),
            }
        } else {
            RelayError::Upstream(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use think_space_core::config::Config;
    use think_space_providers::{LLMResponse, Message, ProviderResult};

    /// Replies "re: <last user message>" unless a scripted error is queued.
    #[derive(Default)]
    struct ScriptedProvider {
        calls: Mutex<Vec<Vec<Message>>>,
        errors: Mutex<VecDeque<ProviderError>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn failing(err: ProviderError) -> Self {
            let provider = Self::default();
            provider.errors.lock().push_back(err);
            provider
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> ProviderResult<LLMResponse> {
            self.calls.lock().push(messages.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = self.errors.lock().pop_front() {
                return Err(err);
            }
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(LLMResponse {
                content: Some(format!("re: {}", last)),
                finish_reason: "stop".to_string(),
                usage: HashMap::new(),
            })
        }
    }

    fn settings() -> RelaySettings {
        RelaySettings::from(&Config::default().provider)
    }

    fn relay_with(provider: Arc<ScriptedProvider>) -> CompletionRelay {
        let provider: Arc<dyn LLMProvider> = provider;
        CompletionRelay::new(Some(provider), Arc::new(SessionManager::new()), settings())
    }

    #[tokio::test]
    async fn test_disabled_relay_always_reports_missing_key() {
        let relay = CompletionRelay::new(None, Arc::new(SessionManager::new()), settings());
        assert!(!relay.is_ready());

        for prompt in ["idea", "", "   "] {
            let err = relay.brainstorm(prompt, None).await.unwrap_err();
            assert!(matches!(err, RelayError::NotConfigured { .. }));
            assert_eq!(
                err.to_string(),
                "Missing API key: set environment variable GROQ_API_KEY"
            );
        }
        assert!(relay.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_without_key_is_disabled() {
        let config = Config::default();
        let relay = CompletionRelay::from_config(&config.provider, Arc::new(SessionManager::new()));
        assert!(!relay.is_ready());
        assert_eq!(relay.model(), "llama-3.3-70b-versatile");
        assert_eq!(relay.provider_label(), "Groq");
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let provider = Arc::new(ScriptedProvider::default());
        let relay = relay_with(provider.clone());

        let err = relay.brainstorm("  \n", None).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidPrompt));
        assert!(provider.calls.lock().is_empty());
        assert!(relay.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_replays_history() {
        let provider = Arc::new(ScriptedProvider::default());
        let relay = relay_with(provider.clone());

        let first = relay.brainstorm("idea A", None).await.unwrap();
        assert_eq!(first.response, "re: idea A");

        let second = relay
            .brainstorm("idea B", Some(first.session_id.as_str()))
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);

        let calls = provider.calls.lock();
        assert_eq!(calls.len(), 2);
        let replayed = &calls[1];
        assert_eq!(replayed.len(), 4);
        assert_eq!(replayed[0].role, Role::System);
        assert_eq!(replayed[1], Message::user("idea A"));
        assert_eq!(replayed[2], Message::assistant("re: idea A"));
        assert_eq!(replayed[3], Message::user("idea B"));

        let history = relay.sessions().history(&first.session_id).unwrap();
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_session_id_gets_fresh_session() {
        let provider = Arc::new(ScriptedProvider::default());
        let relay = relay_with(provider.clone());

        let reply = relay.brainstorm("idea", Some("stale-id")).await.unwrap();
        assert_ne!(reply.session_id, "stale-id");
        assert_eq!(provider.calls.lock()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_decommissioned_model_maps_to_model_unavailable() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::ApiError {
            status: 400,
            code: None,
            message: "The model `llama-3.3-70b-versatile` has been decommissioned".to_string(),
        }));
        let relay = relay_with(provider);

        let err = relay.brainstorm("idea", None).await.unwrap_err();
        match &err {
            RelayError::ModelUnavailable { model, message } => {
                assert_eq!(model, "llama-3.3-70b-versatile");
                assert!(message.contains("decommissioned"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("'llama-3.3-70b-versatile'"));
    }

    #[tokio::test]
    async fn test_other_failures_pass_raw_message_and_keep_history() {
        let provider = Arc::new(ScriptedProvider::default());
        let relay = relay_with(provider.clone());
        let first = relay.brainstorm("idea A", None).await.unwrap();

        provider
            .errors
            .lock()
            .push_back(ProviderError::InvalidResponse("bad gateway".to_string()));
        let err = relay
            .brainstorm("idea B", Some(first.session_id.as_str()))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Upstream(_)));
        assert_eq!(err.to_string(), "Server error: Invalid response: bad gateway");

        let history = relay.sessions().history(&first.session_id).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_completion_is_upstream_error() {
        struct Silent;

        #[async_trait]
        impl LLMProvider for Silent {
            async fn chat(
                &self,
                _messages: Vec<Message>,
                _model: Option<String>,
                _max_tokens: u32,
                _temperature: f32,
            ) -> ProviderResult<LLMResponse> {
                Ok(LLMResponse {
                    content: None,
                    finish_reason: "stop".to_string(),
                    usage: HashMap::new(),
                })
            }
        }

        let relay = CompletionRelay::new(
            Some(Arc::new(Silent) as Arc<dyn LLMProvider>),
            Arc::new(SessionManager::new()),
            settings(),
        );
        let err = relay.brainstorm("idea", None).await.unwrap_err();
        assert!(matches!(err, RelayError::Upstream(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_turns_on_one_session_stay_paired() {
        let provider = Arc::new(ScriptedProvider {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let relay = Arc::new(relay_with(provider.clone()));
        let first = relay.brainstorm("seed", None).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..4 {
            let relay = relay.clone();
            let id = first.session_id.clone();
            handles.push(tokio::spawn(async move {
                relay.brainstorm(&format!("idea {}", n), Some(id.as_str())).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = relay.sessions().history(&first.session_id).unwrap();
        assert_eq!(history.len(), 10);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_during_in_flight_turn() {
        let provider = Arc::new(ScriptedProvider {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let relay = Arc::new(relay_with(provider.clone()));
        let seed = relay.brainstorm("seed", None).await.unwrap();
        let id = seed.session_id.clone();

        let in_flight = {
            let relay = relay.clone();
            let id = id.clone();
            tokio::spawn(async move { relay.brainstorm("a", Some(id.as_str())).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued = {
            let relay = relay.clone();
            let id = id.clone();
            tokio::spawn(async move { relay.brainstorm("b", Some(id.as_str())).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(relay.clear_session(&id));

        // The turn already talking to upstream still gets its reply.
        let first = in_flight.await.unwrap().unwrap();
        assert_eq!(first.response, "re: a");
        assert_eq!(first.session_id, id);

        // The queued turn starts over on a new session.
        let second = queued.await.unwrap().unwrap();
        assert_eq!(second.response, "re: b");
        assert_ne!(second.session_id, id);

        let calls = provider.calls.lock();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].len(), 2);
        assert_eq!(calls[2][1], Message::user("b"));
        drop(calls);

        assert!(relay.sessions().history(&id).unwrap_err().is_not_found());
        assert_eq!(relay.sessions().history(&second.session_id).unwrap().len(), 2);
        assert_eq!(relay.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_session() {
        let relay = relay_with(Arc::new(ScriptedProvider::default()));
        let reply = relay.brainstorm("idea", None).await.unwrap();

        assert!(relay.clear_session(&reply.session_id));
        assert!(!relay.clear_session(&reply.session_id));
    }
}
