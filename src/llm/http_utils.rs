//! HTTP utilities for requests the `async-openai` client does not cover.

use crate::llm::LlmError;
use reqwest::multipart::Form;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Creates an HTTP client with the given request timeout.
#[must_use]
pub fn create_http_client(timeout_secs: u64) -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends a `multipart/form-data` POST and returns the parsed JSON response.
///
/// # Errors
///
/// Returns `LlmError::NetworkError` on connectivity issues, `LlmError::ApiError` on non-success status codes,
/// or `LlmError::JsonError` if parsing fails.
pub async fn send_multipart_request(
    client: &HttpClient,
    url: &str,
    form: Form,
    auth_header: Option<&str>,
) -> Result<Value, LlmError> {
    let mut request = client.post(url).multipart(form);

    if let Some(auth) = auth_header {
        request = request.header("Authorization", auth);
    }

    let response = request
        .send()
        .await
        .map_err(|e| LlmError::NetworkError(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::NetworkError(e.to_string()))?;
    tracing::debug!("Status code: {status}, response: {body}");

    if !status.is_success() {
        return Err(api_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| LlmError::JsonError(e.to_string()))
}

/// Builds an `ApiError` from a failed response, hiding proxy HTML pages and
/// truncating long bodies.
fn api_error(status: StatusCode, body: &str) -> LlmError {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    let message = if is_html {
        format!("API error: {status} (Server returned HTML error page)")
    } else {
        let truncated = crate::utils::truncate_str(body, 500);
        if truncated.len() < body.len() {
            format!("API error: {status} - {truncated}... (truncated)")
        } else {
            format!("API error: {status} - {body}")
        }
    };

    LlmError::ApiError(message)
}

/// Extracts text content from a JSON response by navigating a path.
///
/// Path segments that parse as numbers index into arrays.
///
/// # Errors
///
/// Returns `LlmError::ApiError` if the path is invalid or the target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, LlmError> {
    let mut current = response;

    for segment in path {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index).ok_or_else(|| {
                LlmError::ApiError(format!("Invalid path: missing index {index}"))
            })?;
        } else {
            current = current.get(*segment).ok_or_else(|| {
                LlmError::ApiError(format!("Invalid path: missing key {segment}"))
            })?;
        }
    }

    current
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| LlmError::ApiError(format!("Expected string at path, got: {current:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_content() -> Result<(), LlmError> {
        let response = json!({"text": "hello there", "language": "en"});
        assert_eq!(extract_text_content(&response, &["text"])?, "hello there");
        Ok(())
    }

    #[test]
    fn test_extract_text_content_missing() {
        let response = json!({"error": {"message": "bad"}});
        assert!(extract_text_content(&response, &["text"]).is_err());
    }

    #[test]
    fn test_api_error_hides_html() {
        let err = api_error(
            StatusCode::BAD_GATEWAY,
            "<html><body>502 Bad Gateway</body></html>",
        );
        let text = err.to_string();
        assert!(text.contains("502"));
        assert!(!text.contains("<body>"));
    }

    #[test]
    fn test_api_error_truncates_long_body() {
        let body = "x".repeat(2000);
        let err = api_error(StatusCode::BAD_REQUEST, &body);
        let text = err.to_string();
        assert!(text.contains("(truncated)"));
        assert!(text.len() < 700);
    }
}
