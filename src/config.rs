//! Configuration and settings management
//!
//! Loads settings from environment variables and defines runtime constants.

use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};

/// Display name of the bot
pub const BOT_NAME: &str = "ChatGPT bot";

/// Prompt sent to the model on `/start`
pub const INTRODUCTION_PROMPT: &str = "Introduce yourself and offer your service. Be concise";

/// Reply sent when the model call fails
pub const FALLBACK_REPLY: &str = "oops";

/// Model used for speech recognition
pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Upper bound on the number of chats kept in the history cache
pub const HISTORY_CACHE_MAX_CHATS: u64 = 10_000;

/// Chat histories idle for this long are evicted (24 hours)
pub const HISTORY_CACHE_IDLE_SECS: u64 = 86_400;

// Telegram file download retry policy
/// Initial backoff before retrying a Telegram API call
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff between retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Number of retries after the first attempt
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

const fn default_temperature() -> f32 {
    1.0
}

const fn default_top_p() -> f32 {
    1.0
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_chat_history_size() -> usize {
    20
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

const fn default_http_timeout_secs() -> u64 {
    120
}

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(rename = "tg_apikey")]
    pub telegram_token: String,

    /// `OpenAI` API key
    #[serde(rename = "openai_apikey")]
    pub openai_token: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_openai_url")]
    pub openai_url: String,

    /// Chat completion model
    #[serde(rename = "openai_model_name", default = "default_model")]
    pub openai_model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub openai_temperature: f32,

    /// Nucleus sampling probability mass
    #[serde(default = "default_top_p")]
    pub openai_top_p: f32,

    /// Comma-separated list of Telegram usernames allowed to use the bot
    #[serde(rename = "whitelist")]
    pub users_whitelist_str: Option<String>,

    /// System prompt prepended to every conversation
    #[serde(rename = "chat_gpt_prompt")]
    pub chat_gpt_role: Option<String>,

    /// Number of user/assistant messages kept per chat
    #[serde(default = "default_chat_history_size")]
    pub chat_history_size: usize,

    /// Path to the ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Timeout for requests to the LLM API
    #[serde(default = "default_http_timeout_secs")]
    pub llm_http_timeout_secs: u64,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a mandatory value is missing or malformed.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load settings reading variables from `vars` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a mandatory value is missing or malformed.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .source(vars.clone()),
            )
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
            .add_source(Environment::default().ignore_empty(true).source(vars))
            .build()?;

        s.try_deserialize()
    }

    /// Usernames allowed to talk to the bot. Empty means everyone.
    #[must_use]
    pub fn users_whitelist(&self) -> Vec<String> {
        self.users_whitelist_str
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Checks whether a user with the given username may use the bot
    #[must_use]
    pub fn is_whitelisted(&self, username: Option<&str>) -> bool {
        let whitelist = self.users_whitelist();
        if whitelist.is_empty() {
            return true;
        }
        username.is_some_and(|name| whitelist.iter().any(|allowed| allowed == name))
    }

    /// System prompt, if one is configured and not blank
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.chat_gpt_role
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Human-readable JSON dump of the configuration with tokens masked
    #[must_use]
    pub fn pretty_print(&self) -> String {
        let view = PublicSettings {
            tg_token: mask_secret(&self.telegram_token),
            bot_name: BOT_NAME,
            open_ai_token: mask_secret(&self.openai_token),
            open_ai_url: &self.openai_url,
            open_ai_model: &self.openai_model,
            open_ai_temperature: self.openai_temperature,
            open_ai_top_p: self.openai_top_p,
            users_whitelist: self.users_whitelist(),
            chat_gpts_role: self.system_prompt(),
            chat_history_size: self.chat_history_size,
        };
        serde_json::to_string_pretty(&view).unwrap_or_default()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicSettings<'a> {
    tg_token: String,
    bot_name: &'a str,
    open_ai_token: String,
    open_ai_url: &'a str,
    open_ai_model: &'a str,
    open_ai_temperature: f32,
    open_ai_top_p: f32,
    users_whitelist: Vec<String>,
    chat_gpts_role: Option<&'a str>,
    chat_history_size: usize,
}

/// Keeps the first five characters of a secret and hides the rest
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(5).collect();
    format!("{visible}***")
}
