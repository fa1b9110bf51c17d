//! Google Gemini backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{BackendError, GenerationRequest, TextGenBackend};
use crate::config::BackendConfig;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Calls the Gemini `generateContent` endpoint.
///
/// Authentication rides in a `key` query parameter, which is how the
/// Generative Language API wants it.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiBackend {
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

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn extract_text(body: &serde_json::Value) -> Result<String, BackendError> {
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::Malformed("no candidates[0].content.parts[0].text in reply".into())
            })
    }
}

#[async_trait]
impl TextGenBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = json!({
            "contents": [{"parts": [{"text": request.prompt}]}],
            "generationConfig": {"maxOutputTokens": request.max_tokens},
        });

        tracing::debug!(model = %self.model, "sending gemini request");

        let response = self
            .client
            .post(self.request_url())
            .header("Content-Type", "application/json")
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
        "gemini"
    }
}
