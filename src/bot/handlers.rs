use crate::audio;
use crate::bot::messaging::send_long_message;
use crate::chat::Conversations;
use crate::config::{Settings, FALLBACK_REPLY, INTRODUCTION_PROMPT};
use crate::utils::{retry_telegram_operation, truncate_str};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{
    net::Download,
    prelude::*,
    types::{ChatAction, Me, User},
    utils::command::BotCommands,
};
use tracing::{error, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Ask the model to introduce itself
    #[command(description = "Start the bot.")]
    Start,
    /// Clear chat history
    #[command(description = "Clear chat history.")]
    Clean,
    /// Show the running configuration
    #[command(description = "Show configuration.")]
    Config,
}

/// Username of the sender, or their numeric id when they have none
#[must_use]
pub fn describe_user(user: Option<&User>) -> String {
    user.map_or_else(
        || "unknown".to_string(),
        |u| u.username.clone().unwrap_or_else(|| u.id.0.to_string()),
    )
}

/// Checks the sender against the whitelist, logging ignored users
#[must_use]
pub fn is_allowed(msg: &Message, settings: &Settings) -> bool {
    is_sender_allowed(msg.from.as_ref(), settings)
}

/// Whitelist decision for a sender
#[must_use]
pub fn is_sender_allowed(sender: Option<&User>, settings: &Settings) -> bool {
    let username = sender.and_then(|u| u.username.as_deref());
    if settings.is_whitelisted(username) {
        return true;
    }
    info!(
        "Ignoring message from {}, since they are not in the whitelist",
        describe_user(sender)
    );
    false
}

/// What a text message asks the bot to do
#[derive(Debug, PartialEq, Eq)]
pub enum TextAction {
    /// A command addressed to this bot
    Command(Command),
    /// Slash-prefixed text that is not one of our commands
    UnknownCommand,
    /// Plain text for the model
    Converse,
}

/// Decides how to handle `text`, given the bot's own username
#[must_use]
pub fn classify_text(text: &str, bot_username: &str) -> TextAction {
    if !text.starts_with('/') {
        return TextAction::Converse;
    }
    Command::parse(text, bot_username).map_or(TextAction::UnknownCommand, TextAction::Command)
}

/// Text message handler: commands or conversation
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    me: Me,
    settings: Arc<Settings>,
    conversations: Arc<Conversations>,
) -> Result<()> {
    let text = msg.text().ok_or_else(|| anyhow!("No text found"))?;
    let user_name = describe_user(msg.from.as_ref());

    match classify_text(text, me.username()) {
        TextAction::Command(cmd) => {
            handle_command(&bot, msg.chat.id, &user_name, cmd, &settings, &conversations).await
        }
        TextAction::UnknownCommand => {
            info!("Unknown command from {user_name}: {text}");
            Ok(())
        }
        TextAction::Converse => {
            handle_common_message(&bot, msg.chat.id, &user_name, text, &conversations).await
        }
    }
}

async fn handle_command(
    bot: &Bot,
    chat_id: ChatId,
    user_name: &str,
    cmd: Command,
    settings: &Settings,
    conversations: &Conversations,
) -> Result<()> {
    if cmd == Command::Start {
        send_typing(bot, chat_id).await;
    }
    let reply = command_reply(cmd, chat_id.0, user_name, settings, conversations).await;
    send_long_message(bot, chat_id, &reply, None).await
}

/// Runs a command against the chat's conversation and returns the text to send back
pub async fn command_reply(
    cmd: Command,
    chat_id: i64,
    user_name: &str,
    settings: &Settings,
    conversations: &Conversations,
) -> String {
    match cmd {
        Command::Clean => {
            info!("Cleaning chat history for {user_name}");
            conversations.clear(chat_id).await;
            "Cache cleared".to_string()
        }
        Command::Config => {
            info!("Responding with config to {user_name}");
            settings.pretty_print()
        }
        Command::Start => {
            info!("Responding with introduction message to {user_name}");
            answer_or_fallback(conversations, chat_id, INTRODUCTION_PROMPT).await
        }
    }
}

/// The model's answer to `text`, or [`FALLBACK_REPLY`] when the call fails
pub async fn answer_or_fallback(conversations: &Conversations, chat_id: i64, text: &str) -> String {
    match conversations.reply(chat_id, text).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Model call failed for chat {chat_id}: {e}");
            FALLBACK_REPLY.to_string()
        }
    }
}

/// Shows the typing indicator; a failure here never aborts the reply
pub async fn send_typing(bot: &Bot, chat_id: ChatId) {
    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
        warn!("Failed to send typing action to chat {}: {e}", chat_id.0);
    }
}

/// Sends `text` to the model within the chat's conversation and delivers the answer
async fn handle_common_message(
    bot: &Bot,
    chat_id: ChatId,
    user_name: &str,
    text: &str,
    conversations: &Conversations,
) -> Result<()> {
    info!(
        "Got message from {user_name}, in chat {}: '{}'",
        chat_id.0,
        truncate_str(text, 100)
    );

    send_typing(bot, chat_id).await;
    let answer = answer_or_fallback(conversations, chat_id.0, text).await;
    send_long_message(bot, chat_id, &answer, None).await
}

/// Voice message handler: transcribe, echo the transcript, then converse
///
/// # Errors
///
/// Returns an error if downloading, converting, transcribing or replying fails.
pub async fn handle_voice(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
    conversations: Arc<Conversations>,
) -> Result<()> {
    let voice = msg.voice().ok_or_else(|| anyhow!("No voice found"))?;
    let user_name = describe_user(msg.from.as_ref());
    let chat_id = msg.chat.id;

    info!("Got audio message from {user_name}, in chat {}", chat_id.0);

    send_typing(&bot, chat_id).await;

    let oga_audio = retry_telegram_operation(|| async {
        let file = bot.get_file(voice.file.id.clone()).await?;
        let mut buf = Vec::new();
        bot.download_file(&file.path, &mut buf).await?;
        Ok(buf)
    })
    .await?;

    let wav_audio = audio::convert_oga_to_wav(&settings.ffmpeg_path, &oga_audio).await?;
    let transcript = conversations.transcribe(wav_audio).await?;

    if transcript.trim().is_empty() {
        info!("Empty transcription for voice message in chat {}", chat_id.0);
        return Ok(());
    }

    send_long_message(&bot, chat_id, &transcript, Some(msg.id)).await?;
    handle_common_message(&bot, chat_id, &user_name, &transcript, &conversations).await
}
