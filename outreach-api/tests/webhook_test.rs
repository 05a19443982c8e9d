/// Delivery webhook contract tests

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{config_from, test_env, unique_email, TestContext, TestResponse, WEBHOOK_SECRET};
use outreach_shared::models::email_record::NewEmailRecord;
use outreach_shared::store::Store;
use outreach_shared::webhook::{sign_payload, SIGNATURE_HEADER};
use serde_json::json;

const PATH: &str = "/api/webhooks/resend";

async fn deliver(ctx: &TestContext, payload: &str, signature: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(PATH)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    ctx.send(builder.body(Body::from(payload.to_string())).unwrap()).await
}

async fn deliver_signed(ctx: &TestContext, payload: &str) -> TestResponse {
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    deliver(ctx, payload, Some(&signature)).await
}

async fn seed_record(ctx: &TestContext, provider_email_id: &str) {
    let (sender_id, _) = ctx.signup(&unique_email()).await;
    ctx.store
        .insert_email_record(NewEmailRecord {
            sender_id,
            provider_email_id: provider_email_id.to_string(),
            recipient: "grace@example.com".to_string(),
            subject: "Hello".to_string(),
            template_id: None,
        })
        .await
        .unwrap();
}

fn event(event_type: &str, email_id: &str) -> String {
    json!({
        "type": event_type,
        "created_at": "2026-03-01T12:00:00Z",
        "data": { "email_id": email_id },
    })
    .to_string()
}

#[tokio::test]
async fn test_missing_signature_is_400() {
    let ctx = TestContext::new();

    let response = deliver(&ctx, &event("email.delivered", "re_1"), None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.store.delivery_update_count().await, 0);
}

#[tokio::test]
async fn test_missing_secret_is_500() {
    let mut env = test_env();
    env.remove("RESEND_WEBHOOK_SECRET");
    let ctx = TestContext::with_config(config_from(env));

    let response = deliver(&ctx, &event("email.delivered", "re_1"), Some("abc")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_signature_mismatch_is_403_without_write() {
    let ctx = TestContext::new();
    seed_record(&ctx, "re_1").await;
    let payload = event("email.delivered", "re_1");

    let wrong = sign_payload("some-other-secret", payload.as_bytes());
    let response = deliver(&ctx, &payload, Some(&wrong)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Comparison is exact, so an upper-cased digest is rejected too
    let upper = sign_payload(WEBHOOK_SECRET, payload.as_bytes()).to_uppercase();
    let response = deliver(&ctx, &payload, Some(&upper)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    assert_eq!(ctx.store.delivery_update_count().await, 0);
    assert_eq!(ctx.store.email_records().await[0].status, "sent");
}

#[tokio::test]
async fn test_malformed_payloads_are_400() {
    let ctx = TestContext::new();

    let response = deliver_signed(&ctx, "not json").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = deliver_signed(&ctx, &json!({ "data": { "email_id": "re_1" } }).to_string()).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = deliver_signed(&ctx, &json!({ "type": "email.opened", "data": {} }).to_string()).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(ctx.store.delivery_update_count().await, 0);
}

#[tokio::test]
async fn test_unknown_type_is_acknowledged_without_write() {
    let ctx = TestContext::new();
    seed_record(&ctx, "re_1").await;

    let response = deliver_signed(&ctx, &event("contact.created", "re_1")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "received": true, "handled": false }));
    assert_eq!(ctx.store.delivery_update_count().await, 0);
}

#[tokio::test]
async fn test_known_type_updates_status_and_timestamp() {
    let ctx = TestContext::new();
    seed_record(&ctx, "re_1").await;

    let response = deliver_signed(&ctx, &event("email.opened", "re_1")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "received": true, "handled": true }));

    let record = &ctx.store.email_records().await[0];
    assert_eq!(record.status, "opened");
    assert_eq!(
        record.opened_at.unwrap().to_rfc3339(),
        "2026-03-01T12:00:00+00:00"
    );
}

#[tokio::test]
async fn test_later_event_overwrites_status() {
    let ctx = TestContext::new();
    seed_record(&ctx, "re_1").await;

    deliver_signed(&ctx, &event("email.clicked", "re_1")).await;
    deliver_signed(&ctx, &event("email.delivered", "re_1")).await;

    let record = &ctx.store.email_records().await[0];
    assert_eq!(record.status, "delivered");
    assert!(record.clicked_at.is_some());
    assert!(record.delivered_at.is_some());
}

#[tokio::test]
async fn test_unmatched_email_id_is_still_acknowledged() {
    let ctx = TestContext::new();

    let response = deliver_signed(&ctx, &event("email.bounced", "re_missing")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["handled"], true);
    assert_eq!(ctx.store.delivery_update_count().await, 1);
}

#[tokio::test]
async fn test_store_failure_is_500() {
    let ctx = TestContext::new();
    ctx.store.fail_delivery_updates().await;

    let response = deliver_signed(&ctx, &event("email.delivered", "re_1")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_non_post_is_405() {
    let ctx = TestContext::new();

    let response = ctx.request(Method::GET, PATH, None, None).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}
