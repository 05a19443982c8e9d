/// Outbound provider clients
///
/// - [`EmailProvider`]: delivery provider, implemented by [`ResendClient`]
///   and [`MockEmailProvider`]
/// - [`CompletionProvider`]: text generation, implemented by
///   [`OpenAiClient`] and [`MockCompletionProvider`]
///
/// The mocks are used when no API key is configured and in tests.

mod ai;
mod mock;
mod resend;

pub use ai::OpenAiClient;
pub use mock::{MockCompletionProvider, MockEmailProvider};
pub use resend::ResendClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider error
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No credentials configured for this provider
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Transport failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with an error; `message` is its own text
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Provider answered 2xx with an unexpected body
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// File attached to an outgoing email, content already base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

/// Email handed to the delivery provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Display form, e.g. `Ada Lovelace <ada@mail.example.com>`
    pub from: String,
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Provider acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider email id, later referenced by webhook events
    pub id: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, ProviderError>;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generates text for `prompt`, optionally steered by a system message
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, ProviderError>;
}

/// Recipients as accepted on the wire: one comma-separated string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientList {
    One(String),
    Many(Vec<String>),
}

impl Default for RecipientList {
    fn default() -> Self {
        RecipientList::Many(Vec::new())
    }
}

impl RecipientList {
    /// Trimmed, non-empty addresses
    pub fn normalize(&self) -> Vec<String> {
        let parts: Vec<&str> = match self {
            RecipientList::One(s) => s.split(',').collect(),
            RecipientList::Many(list) => list.iter().flat_map(|s| s.split(',')).collect(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Rewrites an address onto the sending domain, keeping its local part
///
/// `ada@gmail.com` becomes `ada@{domain}`; a value without `@` is used as
/// the local part whole.
pub fn sending_address(from: &str, domain: &str) -> String {
    let from = from.trim();
    let local = from.split_once('@').map(|(local, _)| local).unwrap_or(from);
    format!("{}@{}", local, domain)
}

/// Formats the provider `from` field
pub fn format_from(sender_name: &str, address: &str) -> String {
    let name = sender_name.trim();
    if name.is_empty() {
        address.to_string()
    } else {
        format!("{} <{}>", name, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipients_from_string() {
        let list = RecipientList::One(" a@x.io, b@x.io ,,".to_string());
        assert_eq!(list.normalize(), vec!["a@x.io", "b@x.io"]);
    }

    #[test]
    fn test_recipients_from_array() {
        let list: RecipientList = serde_json::from_str(r#"["a@x.io", " ", "b@x.io"]"#).unwrap();
        assert_eq!(list.normalize(), vec!["a@x.io", "b@x.io"]);
    }

    #[test]
    fn test_recipients_untagged_string() {
        let list: RecipientList = serde_json::from_str(r#""a@x.io""#).unwrap();
        assert_eq!(list, RecipientList::One("a@x.io".to_string()));
    }

    #[test]
    fn test_sending_address() {
        assert_eq!(sending_address("ada@gmail.com", "mail.example.com"), "ada@mail.example.com");
        assert_eq!(sending_address("ada", "mail.example.com"), "ada@mail.example.com");
    }

    #[test]
    fn test_format_from() {
        assert_eq!(format_from("Ada Lovelace", "ada@m.io"), "Ada Lovelace <ada@m.io>");
        assert_eq!(format_from("  ", "ada@m.io"), "ada@m.io");
    }

    #[test]
    fn test_outgoing_email_omits_empty_lists() {
        let email = OutgoingEmail {
            from: "a@m.io".to_string(),
            to: vec!["b@x.io".to_string()],
            cc: vec![],
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            attachments: vec![],
        };
        let json = serde_json::to_value(&email).unwrap();
        assert!(json.get("cc").is_none());
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn test_api_error_passes_message_through() {
        let err = ProviderError::Api {
            status: 422,
            message: "Invalid `to` field".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid `to` field");
    }
}
