/// Command and message handlers
pub mod handlers;
/// Sending replies to Telegram
pub mod messaging;
