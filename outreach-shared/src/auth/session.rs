/// Session tokens and cookies
///
/// A session is an HS256 JWT carrying the sender id, stored in an
/// `HttpOnly` cookie. Tokens are also accepted as `Authorization: Bearer`
/// for non-browser clients.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use outreach_shared::auth::session::{create_session_token, validate_session_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes!!";
/// let sender_id = Uuid::new_v4();
///
/// let token = create_session_token(sender_id, secret, Duration::hours(1))?;
/// let claims = validate_session_token(&token, secret)?;
/// assert_eq!(claims.sub, sender_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token issuer
pub const ISSUER: &str = "outreach";

/// Default cookie name
pub const DEFAULT_COOKIE_NAME: &str = "outreach_session";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to create session: {0}")]
    CreateError(String),

    #[error("Session has expired")]
    Expired,

    #[error("Invalid session: {0}")]
    Invalid(String),
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Sender id
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
}

impl SessionClaims {
    pub fn new(sender_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sender_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
        }
    }
}

/// Signs a session token for a sender
pub fn create_session_token(
    sender_id: Uuid,
    secret: &str,
    ttl: Duration,
) -> Result<String, SessionError> {
    let claims = SessionClaims::new(sender_id, ttl);
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| SessionError::CreateError(e.to_string()))
}

/// Validates signature, issuer and expiry of a session token
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_nbf = true;

    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid(e.to_string()),
        })
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(name: &str, token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        name,
        token,
        ttl.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(name: &str, secure: bool) -> String {
    session_cookie(name, "", Duration::zero(), secure)
}

/// Finds a cookie value in a `Cookie` header
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}
