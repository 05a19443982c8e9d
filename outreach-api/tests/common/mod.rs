//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory store and mock providers, and
//! wraps request plumbing so tests read as HTTP exchanges.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use outreach_api::app::{build_router, AppState};
use outreach_api::config::Config;
use outreach_shared::provider::{
    CompletionProvider, EmailProvider, MockCompletionProvider, MockEmailProvider,
};
use outreach_shared::store::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const SENDING_DOMAIN: &str = "mail.outreach.test";

/// Environment for a test config; callers may override or drop entries
pub fn test_env() -> HashMap<String, String> {
    [
        ("STORE_BACKEND", "memory"),
        ("SESSION_SECRET", "test-session-secret-at-least-32-bytes"),
        ("SENDING_DOMAIN", SENDING_DOMAIN),
        ("RESEND_WEBHOOK_SECRET", WEBHOOK_SECRET),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn config_from(env: HashMap<String, String>) -> Config {
    Config::from_lookup(move |key| env.get(key).cloned()).unwrap()
}

/// One HTTP exchange
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` part of the `Set-Cookie` header
    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub email: Arc<MockEmailProvider>,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(config_from(test_env()))
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_email(config, Arc::new(MockEmailProvider::new()))
    }

    pub fn with_email(config: Config, email: Arc<MockEmailProvider>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider: Arc<dyn EmailProvider> = email.clone();
        let ai: Arc<dyn CompletionProvider> = Arc::new(MockCompletionProvider::new("Generated draft"));
        let state = AppState::new(config, store.clone(), provider, Some(ai));

        Self {
            store,
            email,
            app: build_router(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), None).await
    }

    /// Signs up a sender and returns its id and session cookie
    pub async fn signup(&self, email: &str) -> (Uuid, String) {
        let response = self
            .post(
                "/api/auth/signup",
                json!({
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "email": email,
                    "password": "correct horse battery",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "signup failed: {}", response.body);

        let id = response.body["sender"]["id"].as_str().unwrap().parse().unwrap();
        (id, response.cookie().unwrap())
    }
}

/// Random address so tests never collide
pub fn unique_email() -> String {
    format!("sender-{}@example.com", Uuid::new_v4().simple())
}
