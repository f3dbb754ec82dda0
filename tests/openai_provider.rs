use anyhow::Result;
use chatgpt_tg_bot::config::Settings;
use chatgpt_tg_bot::llm::{ChatMessage, LlmError, LlmProvider, OpenAiProvider};
use mockito::Matcher;
use serde_json::json;

fn settings_for(server: &mockito::ServerGuard) -> Result<Settings> {
    let vars = [
        ("TG_APIKEY", "123456:test"),
        ("OPENAI_APIKEY", "test-key"),
        ("OPENAI_URL", server.url().as_str()),
        ("OPENAI_MODEL_NAME", "gpt-test"),
        ("OPENAI_TEMPERATURE", "0.5"),
        ("OPENAI_TOP_P", "0.25"),
        ("LLM_HTTP_TIMEOUT_SECS", "5"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect();

    Ok(Settings::from_vars(vars)?)
}

fn completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    })
    .to_string()
}

#[tokio::test]
async fn test_chat_completion_request_shape() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-test",
            "temperature": 0.5,
            "top_p": 0.25,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("Hi! How can I help?"))
        .create_async()
        .await;

    let provider = OpenAiProvider::new(&settings_for(&server)?);
    let answer = provider
        .chat_completion(&[ChatMessage::system("be brief"), ChatMessage::user("hello")])
        .await?;

    assert_eq!(answer, "Hi! How can I help?");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_chat_completion_without_choices_is_error() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-124",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "gpt-test",
                "choices": []
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = OpenAiProvider::new(&settings_for(&server)?);
    let result = provider.chat_completion(&[ChatMessage::user("hello")]).await;

    assert!(matches!(result, Err(LlmError::ApiError(_))));
    Ok(())
}

#[tokio::test]
async fn test_transcription_sends_multipart_wav() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/audio/transcriptions")
        .match_header("authorization", "Bearer test-key")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("whisper-1".to_string()),
            Matcher::Regex(r#"filename="speech\.wav""#.to_string()),
            Matcher::Regex("RIFFfakeWAVE".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"text": "turn on the lights"}).to_string())
        .create_async()
        .await;

    let provider = OpenAiProvider::new(&settings_for(&server)?);
    let text = provider.transcribe_audio(b"RIFFfakeWAVE".to_vec()).await?;

    assert_eq!(text, "turn on the lights");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_transcription_error_status() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/audio/transcriptions")
        .with_status(500)
        .with_body(r#"{"error": {"message": "internal"}}"#)
        .create_async()
        .await;

    let provider = OpenAiProvider::new(&settings_for(&server)?);
    let result = provider.transcribe_audio(b"RIFF".to_vec()).await;

    match result {
        Err(LlmError::ApiError(message)) => assert!(message.contains("500")),
        other => panic!("expected API error, got {other:?}"),
    }
    Ok(())
}
