//! LLM provider and client
//!
//! Talks to an OpenAI-compatible API: chat completions for conversations
//! and Whisper transcriptions for voice messages.

mod common;
mod http_utils;
/// `OpenAI` provider implementation
pub mod openai;

pub use openai::OpenAiProvider;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A message in an LLM conversation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Text content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new system message
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    /// Create a new user message
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    /// Create a new assistant message
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

/// Interface for LLM backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate the next assistant message for a full conversation
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Transcribe a WAV recording to text
    async fn transcribe_audio(&self, wav_audio: Vec<u8>) -> Result<String, LlmError>;
}
