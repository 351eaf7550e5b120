//! AI completion collaborator.
//!
//! The pipeline only needs "messages in, text out"; structured results are
//! recovered from the text by [`parse::parse_json_response`].

mod ollama;
pub mod parse;

pub use ollama::OllamaClient;
pub use parse::parse_json_response;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Something that turns a prompt conversation into free text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;
}
