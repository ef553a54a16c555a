//! Integration tests for push token registration.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, post_json, token_for};
use serde_json::json;
use souk_store::memory::MemoryStore;
use uuid::Uuid;

#[tokio::test]
async fn token_is_registered_for_the_caller() {
    let store = MemoryStore::new();
    let app = build_test_app(&store).await;
    let user = Uuid::new_v4();

    let response = post_json(
        app,
        "/v1/notifications/tokens",
        json!({ "token": "device-abc" }),
        Some(&token_for(user)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["platform"], "android");
    assert_eq!(store.tokens_for(user), vec!["device-abc".to_string()]);
}

#[tokio::test]
async fn token_moves_to_the_latest_user() {
    let store = MemoryStore::new();
    let app = build_test_app(&store).await;
    let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

    for user in [first, second] {
        post_json(
            app.clone(),
            "/v1/notifications/tokens",
            json!({ "token": "shared-device", "platform": "ios" }),
            Some(&token_for(user)),
        )
        .await;
    }

    assert!(store.tokens_for(first).is_empty());
    assert_eq!(store.tokens_for(second), vec!["shared-device".to_string()]);
}

#[tokio::test]
async fn empty_token_is_rejected() {
    let app = build_test_app(&MemoryStore::new()).await;
    let response = post_json(app, "/v1/notifications/tokens", json!({ "token": " " }), Some(&token_for(Uuid::new_v4()))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_requires_a_token() {
    let app = build_test_app(&MemoryStore::new()).await;
    let response = post_json(app, "/v1/notifications/tokens", json!({ "token": "device-abc" }), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
