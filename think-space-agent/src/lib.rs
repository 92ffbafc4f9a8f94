//! Completion relay for think-space
//!
//! This crate assembles the upstream request (fixed system prompt, stored
//! history, new user turn) and records each successful exchange in the
//! session store.

pub mod prompt;
pub mod relay;

pub use prompt::SYSTEM_PROMPT;
pub use relay::{BrainstormReply, CompletionRelay, RelayError, RelaySettings};
