//! Session manager for handling multiple sessions

use super::store::{ChatMessage, Role, Session};
use crate::config::SessionsConfig;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Retention limits applied to the session map
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    /// Evict sessions not updated for this long
    pub idle_ttl: Option<Duration>,
    /// Upper bound on live sessions
    pub max_sessions: Option<usize>,
}

impl From<&SessionsConfig> for RetentionPolicy {
    fn from(config: &SessionsConfig) -> Self {
        Self {
            idle_ttl: (config.idle_ttl_secs > 0)
                .then(|| Duration::seconds(config.idle_ttl_secs as i64)),
            max_sessions: (config.max_sessions > 0).then_some(config.max_sessions),
        }
    }
}

struct SessionSlot {
    session: Mutex<Session>,
    turn: Arc<tokio::sync::Mutex<()>>,
}

impl SessionSlot {
    fn new(key: &str) -> Self {
        Self {
            session: Mutex::new(Session::new(key)),
            turn: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn is_busy(&self) -> bool {
        self.turn.try_lock().is_err()
    }
}

/// Exclusive right to run one turn on a session
///
/// Dropping the guard lets the next queued request for the same session run.
pub struct TurnGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl TurnGuard {
    pub fn session_id(&self) -> &str {
        &self.key
    }
}

/// Manages conversation sessions in process memory
///
/// Nothing is persisted; sessions disappear on `clear`, on eviction, or when
/// the process exits.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    policy: RetentionPolicy,
}

impl SessionManager {
    /// Create a session manager without retention limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session manager with the given retention limits
    pub fn with_policy(policy: RetentionPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Return the existing session id, or create a fresh empty session.
    ///
    /// The boolean is true when a new session was created. Unknown ids are not
    /// adopted; the caller always gets a server-generated id back.
    pub fn resolve(&self, session_id: Option<&str>) -> (String, bool) {
        if let Some(id) = session_id {
            if self.sessions.read().contains_key(id) {
                return (id.to_string(), false);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write();
        if let Some(max) = self.policy.max_sessions {
            while sessions.len() >= max {
                match Self::least_recent(&sessions) {
                    Some(victim) => {
                        debug!("Session cap {} reached, evicting {}", max, victim);
                        sessions.remove(&victim);
                    }
                    None => break,
                }
            }
        }
        sessions.insert(id.clone(), Arc::new(SessionSlot::new(&id)));
        debug!("Created session {}", id);
        (id, true)
    }

    /// Append one message to a session's history
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) -> crate::Result<()> {
        let slot = self.slot(session_id)?;
        let mut session = slot.session.lock();
        session.add_message(role, content)
    }

    /// Full transcript of a session, in insertion order
    pub fn history(&self, session_id: &str) -> crate::Result<Vec<ChatMessage>> {
        let slot = self.slot(session_id)?;
        let session = slot.session.lock();
        Ok(session.get_history())
    }

    /// Remove a session entirely. Returns false when the id is unknown.
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id).is_some();
        if removed {
            debug!("Cleared session {}", session_id);
        }
        removed
    }

    /// Wait for exclusive access to run a turn on a session.
    ///
    /// Requests for the same session are served in the order they queued.
    pub async fn lock_turn(&self, session_id: &str) -> crate::Result<TurnGuard> {
        let slot = self.slot(session_id)?;
        let guard = slot.turn.clone().lock_owned().await;
        Ok(TurnGuard {
            key: session_id.to_string(),
            _guard: guard,
        })
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop sessions idle for longer than the configured TTL as of `now`.
    ///
    /// Sessions with a turn in flight are kept. Returns the number removed.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.policy.idle_ttl else {
            return 0;
        };

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.is_busy() || now - slot.session.lock().updated_at <= ttl
        });
        before - sessions.len()
    }

    fn slot(&self, session_id: &str) -> crate::Result<Arc<SessionSlot>> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| crate::Error::NotFound(format!("session {}", session_id)))
    }

    fn least_recent(sessions: &HashMap<String, Arc<SessionSlot>>) -> Option<String> {
        sessions
            .iter()
            .filter(|(_, slot)| !slot.is_busy())
            .min_by_key(|(_, slot)| slot.session.lock().updated_at)
            .map(|(key, _)| key.clone())
    }
}
