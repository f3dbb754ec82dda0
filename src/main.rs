use chatgpt_tg_bot::bot;
use chatgpt_tg_bot::chat::Conversations;
use chatgpt_tg_bot::config::{Settings, HISTORY_CACHE_IDLE_SECS, HISTORY_CACHE_MAX_CHATS};
use chatgpt_tg_bot::history::ChatHistory;
use chatgpt_tg_bot::llm::{LlmProvider, OpenAiProvider};
use chatgpt_tg_bot::logging::{init_logging, RedactionPatterns};
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::Me;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Compile redaction patterns before any log line is written
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    let settings = init_settings();

    info!("Starting ChatGPT Telegram bot");
    info!("Configuration: {}", settings.pretty_print());

    let provider = OpenAiProvider::new(&settings);
    info!("LLM provider initialized (model: {}).", provider.model());
    let provider: Arc<dyn LlmProvider> = Arc::new(provider);

    let history = ChatHistory::new(
        settings.chat_history_size,
        HISTORY_CACHE_MAX_CHATS,
        HISTORY_CACHE_IDLE_SECS,
    );
    let conversations = Arc::new(Conversations::new(
        provider,
        history,
        settings.system_prompt().map(ToString::to_string),
    ));

    let bot = Bot::new(settings.telegram_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, conversations])
        .default_handler(|upd| async move {
            info!("Update {} doesn't have a supported message, skipping", upd.id.0);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration (are TG_APIKEY and OPENAI_APIKEY set?): {e}");
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .filter(|msg: Message, settings: Arc<Settings>| {
            bot::handlers::is_allowed(&msg, &settings)
        })
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
        .branch(dptree::filter(|msg: Message| msg.voice().is_some()).endpoint(handle_voice))
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    me: Me,
    settings: Arc<Settings>,
    conversations: Arc<Conversations>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, me, settings, conversations).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_voice(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
    conversations: Arc<Conversations>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_voice(bot, msg, settings, conversations).await {
        error!("Voice handler error: {}", e);
    }
    respond(())
}
