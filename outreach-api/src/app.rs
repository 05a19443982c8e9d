/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use outreach_api::{app::{build_router, AppState}, config::Config};
/// use outreach_shared::store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::from_config(config, Arc::new(MemoryStore::new()));
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    routing::{delete, get, post},
    Router,
};
use chrono::Duration;
use outreach_shared::{
    auth::middleware::{session_auth_middleware, SessionSettings},
    provider::{
        CompletionProvider, EmailProvider, MockEmailProvider, OpenAiClient, ResendClient,
    },
    quota::QuotaGate,
    store::Store,
    usage_recorder::UsageRecorder,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    /// Delivery provider
    pub email: Arc<dyn EmailProvider>,

    /// Completion provider, `None` when not configured
    pub ai: Option<Arc<dyn CompletionProvider>>,

    pub quota: QuotaGate,
    pub usage: UsageRecorder,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        email: Arc<dyn EmailProvider>,
        ai: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self {
            quota: QuotaGate::new(store.clone()),
            usage: UsageRecorder::new(store.clone()),
            store,
            email,
            ai,
            config: Arc::new(config),
        }
    }

    /// Builds providers from configuration
    ///
    /// Without `RESEND_API_KEY` emails go to the in-process mock provider.
    pub fn from_config(config: Config, store: Arc<dyn Store>) -> Self {
        let http = reqwest_client();

        let email: Arc<dyn EmailProvider> = match &config.resend.api_key {
            Some(key) => Arc::new(ResendClient::new(&config.resend.base_url, key, http.clone())),
            None => {
                tracing::warn!("RESEND_API_KEY not set, using mock email provider");
                Arc::new(MockEmailProvider::new())
            }
        };

        let ai: Option<Arc<dyn CompletionProvider>> = config.ai.api_key.as_ref().map(|key| {
            Arc::new(OpenAiClient::new(&config.ai.base_url, key, &config.ai.model, http))
                as Arc<dyn CompletionProvider>
        });

        Self::new(config, store, email, ai)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            secret: self.config.session.secret.clone(),
            cookie_name: self.config.session.cookie_name.clone(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.config.session.ttl_hours)
    }
}

fn reqwest_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

/// Builds the complete router
///
/// ```text
/// /health                          public
/// /api/auth/{signup,login,logout}  public
/// /api/auth/session                session resolved in handler
/// /api/webhooks/resend             signature-verified
/// /api/schedule                    userId in body
/// /api/send                        optional userId in body
/// /api/usage/check                 userId in body
/// /api/ai/generate                 userId in body
/// /api/usage                       session
/// /api/scheduled[/:id]             session
/// /api/templates[/:id]             session
/// /api/categories                  session
/// /api/history, /api/analytics     session
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/webhooks/resend", post(routes::webhooks::resend_webhook))
        .route("/api/schedule", post(routes::schedule::schedule_emails))
        .route("/api/send", post(routes::send::send_email))
        .route("/api/usage/check", post(routes::usage::check_quota))
        .route("/api/ai/generate", post(routes::ai::generate));

    let settings = state.session_settings();
    let session_routes = Router::new()
        .route("/api/usage", get(routes::usage::get_usage))
        .route("/api/scheduled", get(routes::schedule::list_scheduled))
        .route("/api/scheduled/:id", delete(routes::schedule::cancel_scheduled))
        .route(
            "/api/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route("/api/templates/:id", delete(routes::templates::delete_template))
        .route(
            "/api/categories",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route("/api/history", get(routes::history::list_history))
        .route("/api/analytics", get(routes::history::analytics))
        .layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            session_auth_middleware(settings.clone(), req, next)
        }));

    // Wildcard CORS cannot carry credentials; cookie sessions need listed origins.
    let cors = if !state.config.cors_allows_credentials() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
