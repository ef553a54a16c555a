#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use souk_api::app;
use souk_api::middleware::UserClaims;
use souk_api::state::{AppState, AuthConfig, Repositories};
use souk_lead::LeadConfig;
use souk_offer::FeedConfig;
use souk_shared::models::{Branch, Business, Category, Offer, OfferStatus};
use souk_store::memory::MemoryStore;
use souk_store::LogDispatcher;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";

/// Builds the full router over an in-memory store. Seed categories before
/// calling this; the cache loads once at startup.
pub async fn build_test_app(store: &MemoryStore) -> Router {
    let store = Arc::new(store.clone());
    let repos = Repositories {
        categories: store.clone(),
        offers: store.clone(),
        campaigns: store.clone(),
        leads: store.clone(),
        devices: store,
    };

    let state = AppState::build(
        repos,
        Arc::new(LogDispatcher),
        FeedConfig::default(),
        LeadConfig::default(),
        AuthConfig {
            secret: TEST_SECRET.to_string(),
        },
        None,
    )
    .await
    .unwrap();

    app(state)
}

/// A signed bearer token for `user_id`, valid for an hour.
pub fn token_for(user_id: Uuid) -> String {
    let claims = UserClaims {
        sub: user_id.to_string(),
        role: None,
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes())).unwrap()
}

pub fn category(name: &str, parent_id: Option<Uuid>) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        parent_id,
        icon: None,
        is_active: true,
    }
}

/// Seeds a business owned by `owner_id` with one active branch.
pub fn seed_business(store: &MemoryStore, owner_id: Uuid) -> (Business, Branch) {
    let business = Business {
        id: Uuid::new_v4(),
        owner_id,
        business_name: "Corner Bakery".to_string(),
        logo_url: None,
        created_at: Utc::now() - Duration::days(30),
    };
    let branch = Branch {
        id: Uuid::new_v4(),
        business_id: business.id,
        branch_name: "Downtown".to_string(),
        city: Some("Riyadh".to_string()),
        is_active: true,
    };
    store.seed_business(business.clone());
    store.seed_branch(branch.clone());
    (business, branch)
}

/// Seeds an active offer created `minutes_ago` minutes in the past.
pub fn seed_offer(store: &MemoryStore, branch: &Branch, title: &str, minutes_ago: i64) -> Offer {
    let now = Utc::now();
    let offer = Offer {
        id: Uuid::new_v4(),
        branch_id: branch.id,
        campaign_id: None,
        title: title.to_string(),
        description: None,
        status: OfferStatus::Active,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(7),
        created_by: Uuid::new_v4(),
        created_at: now - Duration::minutes(minutes_ago),
    };
    store.seed_offer(offer.clone());
    offer
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, None, Some(token)).await
}

pub async fn post_json(app: Router, uri: &str, body: Value, token: Option<&str>) -> Response {
    send(app, Method::POST, uri, Some(body), token).await
}

pub async fn patch_json(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PATCH, uri, Some(body), Some(token)).await
}

pub async fn patch_anonymous(app: Router, uri: &str) -> Response {
    send(app, Method::PATCH, uri, None, None).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
