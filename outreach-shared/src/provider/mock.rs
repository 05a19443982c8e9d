/// In-process providers
///
/// [`MockEmailProvider`] accepts every email (or fails every email with a
/// fixed message) and remembers what it was given. Used when no provider key
/// is configured and by tests.

use super::{CompletionProvider, EmailProvider, OutgoingEmail, ProviderError, SendReceipt};
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MockEmailProvider {
    failure: Option<String>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that rejects every email with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            sent: Mutex::default(),
        }
    }

    /// Emails accepted so far
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, ProviderError> {
        if let Some(message) = &self.failure {
            return Err(ProviderError::Api {
                status: 422,
                message: message.clone(),
            });
        }

        self.sent.lock().await.push(email.clone());
        let id = format!("mock_{}", Uuid::new_v4().simple());
        tracing::info!(provider_email_id = %id, to = ?email.to, "Mock provider accepted email");
        Ok(SendReceipt { id })
    }
}

/// Completion provider returning a fixed reply
#[derive(Debug, Clone)]
pub struct MockCompletionProvider {
    reply: String,
}

impl MockCompletionProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, _system: Option<&str>, _prompt: &str) -> Result<String, ProviderError> {
        Ok(self.reply.clone())
    }
}
