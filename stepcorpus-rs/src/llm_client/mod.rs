//! LLM client abstraction.
//!
//! # Implementations
//! - [`openai::OpenAiClient`]: OpenAI chat completions via `async-openai`.

pub mod openai;

use crate::errors::Result;
use serde::Serialize;

/// A chat message for the LLM conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Speaker role in a chat conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Trait for chat-style LLM clients.
#[allow(async_fn_in_trait)]
pub trait LlmClient: Send + Sync {
    /// Send a request and return the assistant's reply as plain text.
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}
