//! Integration tests for lead capture and lead management.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get_auth, patch_json, post_json, seed_business, seed_offer, token_for};
use serde_json::json;
use souk_store::memory::MemoryStore;
use uuid::Uuid;

#[tokio::test]
async fn repeat_contact_returns_the_existing_lead() {
    let store = MemoryStore::new();
    let (_, branch) = seed_business(&store, Uuid::new_v4());
    let offer = seed_offer(&store, &branch, "Bread", 1);
    let app = build_test_app(&store).await;
    let uri = format!("/v1/offers/{}/leads", offer.id);

    let first = post_json(app.clone(), &uri, json!({ "user_phone": "0550000001", "user_name": "Sara" }), None).await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["status"], "new");

    // Surrounding whitespace does not make a new phone number.
    let second = post_json(app, &uri, json!({ "user_phone": " 0550000001 " }), None).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["id"], first["id"]);
    assert_eq!(store.leads_for(offer.id).len(), 1);
}

#[tokio::test]
async fn lead_records_the_caller_when_a_token_is_sent() {
    let store = MemoryStore::new();
    let (_, branch) = seed_business(&store, Uuid::new_v4());
    let offer = seed_offer(&store, &branch, "Bread", 1);
    let app = build_test_app(&store).await;
    let user = Uuid::new_v4();

    let response = post_json(
        app,
        &format!("/v1/offers/{}/leads", offer.id),
        json!({ "user_phone": "0550000002" }),
        Some(&token_for(user)),
    )
    .await;
    assert_eq!(body_json(response).await["user_id"], user.to_string());
}

#[tokio::test]
async fn lead_for_unknown_offer_returns_404() {
    let app = build_test_app(&MemoryStore::new()).await;
    let response = post_json(
        app,
        &format!("/v1/offers/{}/leads", Uuid::new_v4()),
        json!({ "user_phone": "0550000003" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_phone_is_rejected() {
    let store = MemoryStore::new();
    let (_, branch) = seed_business(&store, Uuid::new_v4());
    let offer = seed_offer(&store, &branch, "Bread", 1);
    let app = build_test_app(&store).await;

    let response = post_json(app, &format!("/v1/offers/{}/leads", offer.id), json!({ "user_phone": "  " }), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_moves_forward_only() {
    let store = MemoryStore::new();
    let owner = Uuid::new_v4();
    let (_, branch) = seed_business(&store, owner);
    let offer = seed_offer(&store, &branch, "Bread", 1);
    let app = build_test_app(&store).await;
    let token = token_for(owner);

    let lead = body_json(
        post_json(app.clone(), &format!("/v1/offers/{}/leads", offer.id), json!({ "user_phone": "0550000004" }), None).await,
    )
    .await;
    let status_uri = format!("/v1/offers/leads/{}/status", lead["id"].as_str().unwrap());

    let contacted = patch_json(app.clone(), &status_uri, json!({ "status": "contacted" }), &token).await;
    assert_eq!(contacted.status(), StatusCode::OK);
    let contacted = body_json(contacted).await;
    assert_eq!(contacted["status"], "contacted");
    assert!(contacted["contacted_at"].is_string());

    let backwards = patch_json(app, &status_uri, json!({ "status": "new" }), &token).await;
    assert_eq!(backwards.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn business_leads_need_a_token_and_list_with_counts() {
    let store = MemoryStore::new();
    let owner = Uuid::new_v4();
    let (business, branch) = seed_business(&store, owner);
    let offer = seed_offer(&store, &branch, "Bread", 1);
    let app = build_test_app(&store).await;

    for phone in ["0550000005", "0550000006"] {
        post_json(app.clone(), &format!("/v1/offers/{}/leads", offer.id), json!({ "user_phone": phone }), None).await;
    }

    let uri = format!("/v1/offers/leads/business/{}", business.id);
    let response = common::get(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let page = body_json(get_auth(app, &uri, &token_for(owner)).await).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["meta"]["total"], 2);
    assert_eq!(page["meta"]["new_count"], 2);
    assert_eq!(page["data"][0]["offer_title"], "Bread");
}
