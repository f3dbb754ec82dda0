//! Per-chat conversation history.
//!
//! Only user and assistant turns are cached; the system prompt is added when
//! a request is assembled so that changing it takes effect immediately.

use crate::llm::ChatMessage;
use moka::future::Cache;
use moka::ops::compute::Op;
use std::time::Duration;

/// Bounded cache of recent messages, keyed by Telegram chat id
#[derive(Clone)]
pub struct ChatHistory {
    cache: Cache<i64, Vec<ChatMessage>>,
    max_messages: usize,
}

impl ChatHistory {
    /// Creates a history that keeps at most `max_messages` per chat and at
    /// most `max_chats` chats. Chats idle for `idle_secs` are dropped.
    #[must_use]
    pub fn new(max_messages: usize, max_chats: u64, idle_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_chats)
            .time_to_idle(Duration::from_secs(idle_secs))
            .build();

        Self {
            cache,
            max_messages,
        }
    }

    /// Builds the message list for the next request:
    /// optional system prompt, cached turns, then the latest user message.
    pub async fn assemble(
        &self,
        chat_id: i64,
        system_prompt: Option<&str>,
        latest: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        if let Some(prompt) = system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        if let Some(cached) = self.cache.get(&chat_id).await {
            messages.extend(cached);
        }
        messages.push(ChatMessage::user(latest));
        messages
    }

    /// Appends a user/assistant exchange, dropping the oldest messages
    /// beyond the size limit.
    pub async fn record(&self, chat_id: i64, user_message: &str, assistant_message: &str) {
        let max_messages = self.max_messages;
        let user = ChatMessage::user(user_message);
        let assistant = ChatMessage::assistant(assistant_message);

        self.cache
            .entry(chat_id)
            .and_compute_with(move |entry| {
                let mut messages = entry.map(|e| e.into_value()).unwrap_or_default();
                messages.push(user);
                messages.push(assistant);
                if messages.len() > max_messages {
                    let excess = messages.len() - max_messages;
                    messages.drain(..excess);
                }
                std::future::ready(Op::Put(messages))
            })
            .await;
    }

    /// Removes the history of a chat
    pub async fn clear(&self, chat_id: i64) {
        self.cache.invalidate(&chat_id).await;
    }

    /// Messages currently cached for a chat
    pub async fn messages(&self, chat_id: i64) -> Vec<ChatMessage> {
        self.cache.get(&chat_id).await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(max_messages: usize) -> ChatHistory {
        ChatHistory::new(max_messages, 100, 3600)
    }

    #[tokio::test]
    async fn test_assemble_empty_chat() {
        let history = history(20);

        let messages = history.assemble(1, None, "hi").await;
        assert_eq!(messages, vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_assemble_prepends_system_prompt() {
        let history = history(20);
        history.record(1, "hi", "hello").await;

        let messages = history.assemble(1, Some("be brief"), "again").await;
        assert_eq!(
            messages,
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("again"),
            ]
        );
        // System prompt is never stored
        assert_eq!(history.messages(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_record_drops_oldest_beyond_limit() {
        let history = history(4);
        history.record(7, "q1", "a1").await;
        history.record(7, "q2", "a2").await;
        history.record(7, "q3", "a3").await;

        let messages = history.messages(7).await;
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("q2"),
                ChatMessage::assistant("a2"),
                ChatMessage::user("q3"),
                ChatMessage::assistant("a3"),
            ]
        );
    }

    #[tokio::test]
    async fn test_odd_limit_keeps_latest_messages() {
        let history = history(3);
        history.record(7, "q1", "a1").await;
        history.record(7, "q2", "a2").await;

        let messages = history.messages(7).await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ChatMessage::assistant("a1"));
        assert_eq!(messages[2], ChatMessage::assistant("a2"));
    }

    #[tokio::test]
    async fn test_chats_are_independent_and_clearable() {
        let history = history(20);
        history.record(1, "one", "uno").await;
        history.record(2, "two", "dos").await;

        history.clear(1).await;

        assert!(history.messages(1).await.is_empty());
        assert_eq!(history.messages(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let history = history(1000);
        let mut handles = Vec::new();
        for i in 0..50 {
            let history = history.clone();
            handles.push(tokio::spawn(async move {
                history.record(9, &format!("q{i}"), &format!("a{i}")).await;
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }

        assert_eq!(history.messages(9).await.len(), 100);
    }
}
