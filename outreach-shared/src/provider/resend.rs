/// Resend HTTP client
///
/// # Example
///
/// ```no_run
/// use outreach_shared::provider::{EmailProvider, OutgoingEmail, ResendClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ResendClient::new("https://api.resend.com", "re_key", reqwest::Client::new());
/// let receipt = client
///     .send(&OutgoingEmail {
///         from: "Ada <ada@mail.example.com>".to_string(),
///         to: vec!["grace@example.com".to_string()],
///         cc: vec![],
///         subject: "Hello".to_string(),
///         html: "<p>Hi</p>".to_string(),
///         attachments: vec![],
///     })
///     .await?;
/// println!("sent {}", receipt.id);
/// # Ok(())
/// # }
/// ```

use super::{EmailProvider, OutgoingEmail, ProviderError, SendReceipt};
use async_trait::async_trait;
use serde_json::Value;

pub struct ResendClient {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl ResendClient {
    pub fn new(base_url: &str, api_key: &str, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        }
    }
}

/// Pulls the provider's `message` out of an error body, else the raw text
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .or_else(|| v.pointer("/error/message").and_then(Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl EmailProvider for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, ProviderError> {
        let response = self
            .http_client
            .post(format!("{}/emails", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            tracing::warn!(status = status.as_u16(), "Resend rejected email");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let receipt = response
            .json::<SendReceipt>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        tracing::debug!(provider_email_id = %receipt.id, "Email accepted by Resend");
        Ok(receipt)
    }
}
