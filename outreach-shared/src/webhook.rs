/// Delivery-provider webhook handling
///
/// Verifies the `x-resend-signature` header and maps provider event types
/// onto [`DeliveryStatus`] updates of the history table.
///
/// The signature is the lowercase hex HMAC-SHA256 of the raw request body,
/// keyed with the shared webhook secret. Comparison is exact and runs in
/// constant time.
///
/// # Example
///
/// ```
/// use outreach_shared::webhook::{parse_event, sign_payload, verify_signature};
///
/// let body = br#"{"type":"email.opened","data":{"email_id":"re_123"}}"#;
/// let signature = sign_payload("whsec_test", body);
/// assert!(verify_signature("whsec_test", body, &signature));
///
/// let event = parse_event(body).unwrap();
/// assert_eq!(event.email_id, "re_123");
/// ```

use crate::models::email_record::{DeliveryStatus, DeliveryUpdate};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "x-resend-signature";

/// Webhook payload error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Parsed provider event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Raw event type, e.g. `email.delivered`
    pub event_type: String,

    /// Provider email id the event refers to
    pub email_id: String,

    /// Event time reported by the provider
    pub created_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    /// Delivery status for this event, `None` for unhandled types
    pub fn status(&self) -> Option<DeliveryStatus> {
        map_event_type(&self.event_type)
    }

    /// Builds the update to apply, stamping `now` when the event has no time
    pub fn delivery_update(&self, now: DateTime<Utc>) -> Option<DeliveryUpdate> {
        self.status().map(|status| DeliveryUpdate {
            status,
            occurred_at: self.created_at.unwrap_or(now),
        })
    }
}

/// Maps a provider event type to a delivery status
pub fn map_event_type(event_type: &str) -> Option<DeliveryStatus> {
    match event_type {
        "email.sent" => Some(DeliveryStatus::Sent),
        "email.delivered" => Some(DeliveryStatus::Delivered),
        "email.delivery_delayed" => Some(DeliveryStatus::DeliveryDelayed),
        "email.opened" => Some(DeliveryStatus::Opened),
        "email.clicked" => Some(DeliveryStatus::Clicked),
        "email.bounced" => Some(DeliveryStatus::Bounced),
        "email.complained" => Some(DeliveryStatus::Complained),
        _ => None,
    }
}

/// Parses a raw webhook body
///
/// `type` and `data.email_id` are required. `created_at` is optional and
/// ignored when it is not RFC 3339.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| WebhookError::InvalidJson)?;

    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::MissingField("type"))?;

    let email_id = value
        .get("data")
        .and_then(|data| data.get("email_id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::MissingField("data.email_id"))?;

    let created_at = value
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(WebhookEvent {
        event_type: event_type.to_string(),
        email_id: email_id.to_string(),
        created_at,
    })
}

/// Computes the hex HMAC-SHA256 signature of a payload
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a signature header against the payload
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    constant_time_compare(&sign_payload(secret, payload), signature)
}

/// Constant-time string comparison
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signature_is_lowercase_hex() {
        let sig = sign_payload("secret", b"payload");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_verify_is_exact() {
        let body = b"{\"type\":\"email.sent\"}";
        let sig = sign_payload("secret", body);

        assert!(verify_signature("secret", body, &sig));
        assert!(!verify_signature("other", body, &sig));
        assert!(!verify_signature("secret", body, &sig.to_uppercase()));
        assert!(!verify_signature("secret", body, ""));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_event_type_mapping() {
        assert_eq!(map_event_type("email.sent"), Some(DeliveryStatus::Sent));
        assert_eq!(map_event_type("email.delivered"), Some(DeliveryStatus::Delivered));
        assert_eq!(
            map_event_type("email.delivery_delayed"),
            Some(DeliveryStatus::DeliveryDelayed)
        );
        assert_eq!(map_event_type("email.opened"), Some(DeliveryStatus::Opened));
        assert_eq!(map_event_type("email.clicked"), Some(DeliveryStatus::Clicked));
        assert_eq!(map_event_type("email.bounced"), Some(DeliveryStatus::Bounced));
        assert_eq!(map_event_type("email.complained"), Some(DeliveryStatus::Complained));
        assert_eq!(map_event_type("contact.created"), None);
    }

    #[test]
    fn test_parse_event_requires_fields() {
        assert_eq!(parse_event(b"not json"), Err(WebhookError::InvalidJson));
        assert_eq!(
            parse_event(br#"{"data":{"email_id":"re_1"}}"#),
            Err(WebhookError::MissingField("type"))
        );
        assert_eq!(
            parse_event(br#"{"type":"email.sent","data":{}}"#),
            Err(WebhookError::MissingField("data.email_id"))
        );
    }

    #[test]
    fn test_delivery_update_uses_event_time() {
        let event = parse_event(
            br#"{"type":"email.clicked","created_at":"2025-03-01T10:00:00Z","data":{"email_id":"re_1"}}"#,
        )
        .unwrap();
        let now = Utc::now();
        let update = event.delivery_update(now).unwrap();

        assert_eq!(update.status, DeliveryStatus::Clicked);
        assert_eq!(update.occurred_at, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_delivery_update_falls_back_to_now() {
        let event = parse_event(br#"{"type":"email.opened","data":{"email_id":"re_1"}}"#).unwrap();
        let now = Utc::now();
        assert_eq!(event.delivery_update(now).unwrap().occurred_at, now);
    }

    #[test]
    fn test_unknown_type_has_no_update() {
        let event = parse_event(br#"{"type":"domain.updated","data":{"email_id":"re_1"}}"#).unwrap();
        assert!(event.delivery_update(Utc::now()).is_none());
    }
}
