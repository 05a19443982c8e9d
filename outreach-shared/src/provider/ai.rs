/// OpenAI-compatible chat completion client

use super::resend::error_message;
use super::{CompletionProvider, ProviderError};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "messages": messages }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("missing choices[0].message.content".to_string()))
    }
}
