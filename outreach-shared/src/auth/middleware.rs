/// Session authentication middleware
///
/// Reads the session token from the session cookie, falling back to an
/// `Authorization: Bearer` header, and inserts an [`AuthContext`] into the
/// request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::{self, Next}, routing::get, Router};
/// use outreach_shared::auth::middleware::{session_auth_middleware, SessionSettings};
///
/// let settings = SessionSettings {
///     secret: "a-secret-of-at-least-thirty-two-bytes!!".to_string(),
///     cookie_name: "outreach_session".to_string(),
/// };
///
/// let app: Router = Router::new()
///     .route("/api/usage", get(|| async { "usage" }))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         session_auth_middleware(settings.clone(), req, next)
///     }));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::{cookie_value, validate_session_token, SessionError};

/// Authenticated sender attached to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub sender_id: Uuid,
}

/// What the middleware needs to validate sessions
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub secret: String,
    pub cookie_name: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => "Not authenticated".to_string(),
            AuthError::InvalidToken(msg) => msg,
        };
        let body = Json(serde_json::json!({
            "error": "unauthorized",
            "message": message,
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extracts the raw session token from request headers
pub fn session_token<'a>(headers: &'a axum::http::HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| cookie_value(v, cookie_name));

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    })
}

/// Resolves the request's session, if any
pub fn authenticate(
    headers: &axum::http::HeaderMap,
    settings: &SessionSettings,
) -> Result<AuthContext, AuthError> {
    let token = session_token(headers, &settings.cookie_name).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_session_token(token, &settings.secret).map_err(|e| match e {
        SessionError::Expired => AuthError::InvalidToken("Session expired".to_string()),
        _ => AuthError::InvalidToken("Invalid session".to_string()),
    })?;

    Ok(AuthContext {
        sender_id: claims.sub,
    })
}

/// Rejects requests without a valid session with 401
pub async fn session_auth_middleware(
    settings: SessionSettings,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = authenticate(req.headers(), &settings)?;
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session_token;
    use axum::http::{HeaderMap, HeaderValue};
    use chrono::Duration;

    fn settings() -> SessionSettings {
        SessionSettings {
            secret: "test-secret-that-is-long-enough-123456".to_string(),
            cookie_name: "outreach_session".to_string(),
        }
    }

    #[test]
    fn test_authenticate_from_cookie() {
        let sender_id = Uuid::new_v4();
        let token = create_session_token(sender_id, &settings().secret, Duration::hours(1)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("a=b; outreach_session={}", token)).unwrap(),
        );

        let context = authenticate(&headers, &settings()).unwrap();
        assert_eq!(context.sender_id, sender_id);
    }

    #[test]
    fn test_authenticate_from_bearer() {
        let sender_id = Uuid::new_v4();
        let token = create_session_token(sender_id, &settings().secret, Duration::hours(1)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        assert_eq!(authenticate(&headers, &settings()).unwrap().sender_id, sender_id);
    }

    #[test]
    fn test_missing_session() {
        let headers = HeaderMap::new();
        assert!(matches!(
            authenticate(&headers, &settings()),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_garbage_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("outreach_session=garbage"));
        assert!(matches!(
            authenticate(&headers, &settings()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_auth_error_is_401() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
