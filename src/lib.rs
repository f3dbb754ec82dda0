#![deny(missing_docs)]
//! ChatGPT Telegram bot
//!
//! Relays Telegram chats and voice messages to an OpenAI-compatible API,
//! keeping a short rolling history per chat.

/// Voice message conversion through ffmpeg
pub mod audio;
/// Telegram bot implementation
pub mod bot;
/// Conversation service on top of the LLM provider
pub mod chat;
/// Configuration management
pub mod config;
/// Per-chat history cache
pub mod history;
/// LLM provider and client
pub mod llm;
/// Log output setup with secret redaction
pub mod logging;
/// Text helpers and retry utilities
pub mod utils;
