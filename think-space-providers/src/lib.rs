//! LLM provider integrations for think-space
//!
//! This crate provides the provider abstraction and an OpenAI-compatible
//! chat-completions client used to reach the upstream model.

pub mod base;
pub mod compatible;
pub mod registry;

pub use base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use compatible::CompatibleClient;
pub use registry::{ProviderRegistry, ProviderSpec};
