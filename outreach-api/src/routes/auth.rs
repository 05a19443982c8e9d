/// Authentication endpoints
///
/// - `POST /api/auth/signup` - create a sender and start a session
/// - `POST /api/auth/login` - start a session
/// - `POST /api/auth/logout` - clear the session cookie
/// - `GET /api/auth/session` - current sender
///
/// Sessions are HS256 tokens carried in an `HttpOnly` cookie.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use outreach_shared::{
    auth::{
        middleware::authenticate,
        password::{hash_password, verify_password},
        session,
    },
    models::{
        plan::PlanType,
        sender::{NewSender, Sender},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sign-up request; every field is required but absence is reported per field
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Normalized sign-up fields, checked after the required-field pass
///
/// Lengths follow the `senders` column sizes.
#[derive(Debug, Validate)]
struct SignupFields {
    #[validate(length(max = 100, message = "First name must be at most 100 characters"))]
    first_name: String,

    #[validate(length(max = 100, message = "Last name must be at most 100 characters"))]
    last_name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 320, message = "Email must be at most 320 characters")
    )]
    email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub sender: Sender,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Reports field errors under their request (camelCase) names
fn request_field_names(errors: validator::ValidationErrors) -> ApiError {
    match ApiError::from(errors) {
        ApiError::ValidationError(details) => ApiError::ValidationError(
            details
                .into_iter()
                .map(|mut detail| {
                    detail.field = match detail.field.as_str() {
                        "first_name" => "firstName".to_string(),
                        "last_name" => "lastName".to_string(),
                        _ => detail.field,
                    };
                    detail
                })
                .collect(),
        ),
        other => other,
    }
}

/// Creates the sender, its free plan and zeroed usage, then signs in
///
/// # Errors
///
/// - `422`: a required field is blank, a name is longer than 100
///   characters, the email is malformed or the password is shorter than 8
///   characters
/// - `409`: the email is already registered
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let first_name = present(&req.first_name);
    let last_name = present(&req.last_name);
    let email = present(&req.email);
    let password = present(&req.password);

    let missing: Vec<ValidationErrorDetail> = [
        ("firstName", first_name, "First name is required"),
        ("lastName", last_name, "Last name is required"),
        ("email", email, "Email is required"),
        ("password", password, "Password is required"),
    ]
    .iter()
    .filter(|(_, value, _)| value.is_none())
    .map(|(field, _, message)| ValidationErrorDetail::new(field, message))
    .collect();
    if !missing.is_empty() {
        return Err(ApiError::ValidationError(missing));
    }

    let fields = SignupFields {
        first_name: first_name.unwrap_or_default().to_string(),
        last_name: last_name.unwrap_or_default().to_string(),
        email: email.unwrap_or_default().to_lowercase(),
        password: password.unwrap_or_default().to_string(),
    };
    fields.validate().map_err(request_field_names)?;

    let password_hash = hash_password(&fields.password)?;

    let sender = state
        .store
        .create_account(NewSender {
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            password_hash,
            avatar_url: None,
            is_anonymous: false,
            plan_type: PlanType::Free,
        })
        .await?;

    tracing::info!(sender_id = %sender.id, "Sender signed up");

    start_session(&state, sender)
}

/// Verifies credentials and starts a session
///
/// Unknown email and wrong password both answer `401 Invalid email or password`.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let email = req.email.trim().to_lowercase();
    let sender = state
        .store
        .find_sender_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(req.password.trim(), &sender.password_hash)? {
        tracing::debug!(sender_id = %sender.id, "Password mismatch");
        return Err(invalid());
    }

    start_session(&state, sender)
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = session::clear_session_cookie(
        &state.config.session.cookie_name,
        state.config.api.production,
    );

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Current sender, 401 without a valid session or when the sender is gone
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionResponse>> {
    let auth = authenticate(&headers, &state.session_settings())?;

    let sender = state
        .store
        .find_sender(auth.sender_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    Ok(Json(SessionResponse { sender }))
}

fn start_session(state: &AppState, sender: Sender) -> ApiResult<impl IntoResponse> {
    let ttl = state.session_ttl();
    let token = session::create_session_token(sender.id, &state.config.session.secret, ttl)?;
    let cookie = session::session_cookie(
        &state.config.session.cookie_name,
        &token,
        ttl,
        state.config.api.production,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(SessionResponse { sender }),
    ))
}
