//! Session management for conversation history
//!
//! Sessions map an opaque identifier to an ordered user/assistant
//! transcript held in process memory.

pub mod manager;
pub mod store;

pub use manager::{RetentionPolicy, SessionManager, TurnGuard};
pub use store::{ChatMessage, Role, Session};
