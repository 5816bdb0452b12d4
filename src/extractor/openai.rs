//! OpenAI-compatible chat completions backend with strict JSON schema output.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ExtractionError, LanguageModel, StructuredRequest};
use crate::config::LlmConfig;

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default extraction model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Language model backed by `/v1/chat/completions`.
pub struct OpenAiLanguageModel {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiLanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiLanguageModel")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiLanguageModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            client: reqwest::Client::new(),
        }
    }

    /// Build from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Request`] if the HTTP client cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ExtractionError> {
        let model = Self::new(config.api_key.clone(), config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(model)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Rebuild the HTTP client with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Request`] if the client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ExtractionError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    fn build_body(&self, request: &StructuredRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": self.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                }
            }
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

/// Extract an error message from an OpenAI error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Pull `choices[0].message.content` (or its refusal) out of a completion.
fn read_content(response: &serde_json::Value) -> Result<String, ExtractionError> {
    let message = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or(ExtractionError::EmptyResponse)?;

    if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str())
        && !refusal.trim().is_empty()
    {
        return Err(ExtractionError::Refused(refusal.to_owned()));
    }

    match message.get("content").and_then(|c| c.as_str()) {
        Some(content) if !content.trim().is_empty() => Ok(content.to_owned()),
        _ => Err(ExtractionError::EmptyResponse),
    }
}

#[async_trait]
impl LanguageModel for OpenAiLanguageModel {
    async fn complete_json(&self, request: &StructuredRequest) -> Result<String, ExtractionError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_body(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Request(format!("OpenAI request timed out: {e}"))
                } else {
                    ExtractionError::Request(format!("OpenAI request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body: extract_error_message(&body_text),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidJson(format!("completion envelope: {e}")))?;
        let content = read_content(&json)?;
        debug!(model = %self.model, bytes = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn request() -> StructuredRequest {
        StructuredRequest {
            system: "sys".to_owned(),
            user: "usr".to_owned(),
            schema_name: "task_draft".to_owned(),
            schema: serde_json::json!({"type": "object"}),
        }
    }

    #[test]
    fn body_requests_strict_json_schema() {
        let model = OpenAiLanguageModel::new("sk", "gpt-4o-mini").with_max_tokens(Some(256));
        let body = model.build_body(&request());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["response_format"]["json_schema"]["name"], "task_draft");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let model = OpenAiLanguageModel::new("sk", "m").with_base_url("http://localhost:8080/");
        assert_eq!(model.base_url, "http://localhost:8080");
    }

    #[test]
    fn read_content_handles_refusal_and_empty() {
        let refused = serde_json::json!({
            "choices": [{"message": {"content": null, "refusal": "no"}}]
        });
        assert!(matches!(
            read_content(&refused),
            Err(ExtractionError::Refused(_))
        ));

        let empty = serde_json::json!({"choices": [{"message": {"content": ""}}]});
        assert!(matches!(
            read_content(&empty),
            Err(ExtractionError::EmptyResponse)
        ));

        let missing = serde_json::json!({"choices": []});
        assert!(matches!(
            read_content(&missing),
            Err(ExtractionError::EmptyResponse)
        ));
    }

    #[test]
    fn error_message_prefers_api_error_field() {
        let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#;
        assert_eq!(extract_error_message(body), "Invalid API key");
        assert_eq!(extract_error_message("gateway down"), "gateway down");
    }
}
