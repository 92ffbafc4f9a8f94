//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation session
///
/// The stored transcript only ever holds user and assistant messages in
/// strict alternation, starting with the user. The system prompt is never
/// stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier
    pub key: String,
    /// Messages in the session, in insertion order
    pub messages: Vec<ChatMessage>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Role the next appended message must have
    pub fn expected_role(&self) -> Role {
        match self.messages.last().map(|m| m.role) {
            Some(Role::User) => Role::Assistant,
            _ => Role::User,
        }
    }

    /// Add a message to the session
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) -> crate::Result<()> {
        if role == Role::System {
            return Err(crate::Error::Validation(
                "system messages are not stored in session history".to_string(),
            ));
        }
        let expected = self.expected_role();
        if role != expected {
            return Err(crate::Error::Validation(format!(
                "session {} expects a {} message next, got {}",
                self.key, expected, role
            )));
        }

        self.messages.push(ChatMessage::new(role, content));
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Full transcript for replay to the completion call
    pub fn get_history(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
