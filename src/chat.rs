//! Conversation service: joins the history cache with the LLM provider.

use crate::history::ChatHistory;
use crate::llm::{LlmError, LlmProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-chat conversations with the model
pub struct Conversations {
    provider: Arc<dyn LlmProvider>,
    history: ChatHistory,
    system_prompt: Option<String>,
}

impl Conversations {
    /// Creates the service
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        history: ChatHistory,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            provider,
            history,
            system_prompt,
        }
    }

    /// Sends `text` in the context of the chat's history and returns the answer.
    ///
    /// The exchange is remembered only when the model answered.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; history is left untouched in that case.
    pub async fn reply(&self, chat_id: i64, text: &str) -> Result<String, LlmError> {
        let messages = self
            .history
            .assemble(chat_id, self.system_prompt.as_deref(), text)
            .await;

        match self.provider.chat_completion(&messages).await {
            Ok(answer) => {
                self.history.record(chat_id, text, &answer).await;
                info!("Chat {chat_id}: answered with {} chars", answer.chars().count());
                Ok(answer)
            }
            Err(e) => {
                warn!("Chat {chat_id}: completion failed: {e}");
                Err(e)
            }
        }
    }

    /// Converts a WAV recording to text
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn transcribe(&self, wav_audio: Vec<u8>) -> Result<String, LlmError> {
        self.provider.transcribe_audio(wav_audio).await
    }

    /// Forgets everything said in a chat
    pub async fn clear(&self, chat_id: i64) {
        self.history.clear(chat_id).await;
    }
}
