use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use souk_offer::{offer_types, FeedPage, OfferTypeInfo};
use souk_shared::models::{
    CampaignCreated, CampaignWithOffers, CreateCampaignRequest, CreateOfferRequest, CreatedOffer,
    FeedOffer, Offer, OfferDetail,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{require_auth, AuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub cursor: Option<Uuid>,
    pub limit: Option<i64>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/offers", post(create_offer))
        .route("/v1/offers/campaigns", post(create_campaign))
        .route("/v1/offers/{id}/toggle-status", patch(toggle_status))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/v1/offers/feed", get(get_feed))
        .route("/v1/offers/hot-deals", get(hot_deals))
        .route("/v1/offers/types", get(list_offer_types))
        .route("/v1/offers/business/{business_id}", get(business_offers))
        .route("/v1/offers/campaigns/{id}", get(get_campaign))
        .route("/v1/offers/{id}", get(get_offer))
        .merge(protected)
}

/// GET /v1/offers/feed?cursor=&limit=
async fn get_feed(State(state): State<AppState>, Query(params): Query<FeedParams>) -> Result<Json<FeedPage>, AppError> {
    let page = state.feed.get_page(params.cursor, params.limit).await?;
    Ok(Json(page))
}

/// GET /v1/offers/hot-deals
async fn hot_deals(State(state): State<AppState>) -> Result<Json<Vec<FeedOffer>>, AppError> {
    Ok(Json(state.feed.hot_deals().await?))
}

/// GET /v1/offers/types
async fn list_offer_types() -> Json<Vec<OfferTypeInfo>> {
    Json(offer_types())
}

/// GET /v1/offers/business/{business_id}
async fn business_offers(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<Vec<FeedOffer>>, AppError> {
    Ok(Json(state.feed.business_offers(business_id).await?))
}

/// GET /v1/offers/{id}
async fn get_offer(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OfferDetail>, AppError> {
    Ok(Json(state.feed.get_offer(id).await?))
}

/// POST /v1/offers
async fn create_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<CreatedOffer>), AppError> {
    let created = state.campaigns.create_offer(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /v1/offers/campaigns
///
/// Followers are notified after the response is decided; a failed push never
/// changes it.
async fn create_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignCreated>), AppError> {
    let created = state.campaigns.create_campaign(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /v1/offers/{id}/toggle-status
async fn toggle_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Offer>, AppError> {
    Ok(Json(state.campaigns.toggle_offer_status(id).await?))
}

/// GET /v1/offers/campaigns/{id}
async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignWithOffers>, AppError> {
    Ok(Json(state.campaigns.get_campaign(id).await?))
}
