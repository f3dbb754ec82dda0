//! Common messaging utilities for Telegram bot.

use crate::utils;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyParameters};

/// Maximum message length for Telegram with safety margin.
/// Telegram's limit is 4096 characters.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Sends `text` as plain text, split into several messages when it exceeds
/// [`TELEGRAM_MESSAGE_LIMIT`]. Only the first part replies to `reply_to`.
///
/// # Errors
///
/// Returns an error if any message fails to send.
pub async fn send_long_message(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    reply_to: Option<MessageId>,
) -> Result<()> {
    let parts = utils::split_long_message(text, TELEGRAM_MESSAGE_LIMIT);

    for (index, part) in parts.into_iter().enumerate() {
        let mut request = bot.send_message(chat_id, part);
        if let (0, Some(message_id)) = (index, reply_to) {
            request = request.reply_parameters(ReplyParameters::new(message_id));
        }
        request.await?;
    }

    Ok(())
}
