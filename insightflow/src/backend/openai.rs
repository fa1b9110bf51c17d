//! OpenAI chat completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{BackendError, GenerationRequest, TextGenBackend};
use crate::config::BackendConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Calls the OpenAI `chat/completions` endpoint with bearer auth.
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    /// Creates a backend with an API key and stock defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Creates a backend from a [`BackendConfig`].
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut backend = Self::new(config.api_key.clone());
        if let Some(model) = &config.model {
            backend = backend.with_model(model.clone());
        }
        if let Some(base_url) = &config.base_url {
            backend = backend.with_base_url(base_url.clone());
        }
        backend
    }

    /// Overrides the base URL, for proxies or test servers.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Overrides the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn extract_text(body: &serde_json::Value) -> Result<String, BackendError> {
        body.pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::Malformed("no choices[0].message.content in reply".into())
            })
    }
}

#[async_trait]
impl TextGenBackend for OpenAiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "max_tokens": request.max_tokens,
        });

        tracing::debug!(model = %self.model, "sending openai request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == 401 || status == 403 {
                return Err(BackendError::Auth {
                    status: status.as_u16(),
                });
            }
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: serde_json::Value = response.json().await?;
        Self::extract_text(&reply)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let backend = OpenAiBackend::new("test_key");
        assert_eq!(backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(backend.model, DEFAULT_MODEL);
        assert_eq!(backend.name(), "openai");
    }

    #[test]
    fn test_chained_builders() {
        let backend = OpenAiBackend::new("test_key")
            .with_base_url("https://custom.api.com/v1")
            .with_model("gpt-4o");

        assert_eq!(backend.base_url, "https://custom.api.com/v1");
        assert_eq!(backend.model, "gpt-4o");
    }

    #[test]
    fn test_extract_text_happy_path() {
        let reply = serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "No anomalies found."}}
            ]
        });
        assert_eq!(
            OpenAiBackend::extract_text(&reply).unwrap(),
            "No anomalies found."
        );
    }

    #[test]
    fn test_extract_text_missing_content_is_malformed() {
        let reply = serde_json::json!({"choices": [{"message": {"role": "assistant"}}]});
        assert!(matches!(
            OpenAiBackend::extract_text(&reply),
            Err(BackendError::Malformed(_))
        ));
    }
}
