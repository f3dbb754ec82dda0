use super::common::{build_openai_messages, extract_openai_response};
use super::http_utils;
use super::{ChatMessage, LlmError, LlmProvider};
use crate::config::{Settings, TRANSCRIPTION_MODEL};
use async_openai::{
    config::OpenAIConfig, types::chat::CreateChatCompletionRequestArgs, Client,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client as HttpClient;
use tracing::{debug, info};

/// LLM provider for the `OpenAI` API or any server exposing the same routes
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    http_client: HttpClient,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl OpenAiProvider {
    /// Create a provider from application settings
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let api_base = settings.openai_url.trim_end_matches('/').to_string();
        let http_client = http_utils::create_http_client(settings.llm_http_timeout_secs);
        let config = OpenAIConfig::new()
            .with_api_key(settings.openai_token.clone())
            .with_api_base(api_base.clone());

        Self {
            client: Client::with_config(config).with_http_client(http_client.clone()),
            http_client,
            api_key: settings.openai_token.clone(),
            api_base,
            model: settings.openai_model.clone(),
            temperature: settings.openai_temperature,
            top_p: settings.openai_top_p,
        }
    }

    /// Model used for chat completions
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(build_openai_messages(messages)?)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?;

        info!(
            "Sending chat completion request: model={}, messages={}",
            self.model,
            messages.len()
        );
        if let Ok(body) = serde_json::to_string(&request) {
            debug!("Request body: {body}");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        debug!("Response: {response:?}");
        extract_openai_response(&response)
    }

    async fn transcribe_audio(&self, wav_audio: Vec<u8>) -> Result<String, LlmError> {
        let file = Part::bytes(wav_audio)
            .file_name("speech.wav")
            .mime_str("application/octet-stream")
            .map_err(|e| LlmError::Unknown(e.to_string()))?;
        let form = Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part("file", file);

        let url = format!("{}/audio/transcriptions", self.api_base);
        info!("Sending transcription request to {url}");

        let auth = format!("Bearer {}", self.api_key);
        let response =
            http_utils::send_multipart_request(&self.http_client, &url, form, Some(&auth)).await?;
        http_utils::extract_text_content(&response, &["text"])
    }
}
