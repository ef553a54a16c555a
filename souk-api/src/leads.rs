use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use souk_shared::models::{CreateLeadRequest, Interaction, LeadPage, LeadStatus, OfferLead};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{optional_auth, require_auth, MaybeUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub user_phone: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeadListParams {
    pub status: Option<LeadStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: LeadStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/offers/{id}/leads", post(create_lead))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected = Router::new()
        .route("/v1/offers/leads/business/{business_id}", get(business_leads))
        .route("/v1/offers/leads/{id}/status", patch(update_status))
        .route("/v1/offers/leads/recent/{business_id}", get(recent_interactions))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

/// POST /v1/offers/{id}/leads
///
/// A repeat contact inside the dedup window returns the existing lead.
async fn create_lead(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Extension(MaybeUser(user)): Extension<MaybeUser>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<OfferLead>, AppError> {
    let lead = state
        .leads
        .create_lead(CreateLeadRequest {
            offer_id,
            user_id: user.map(|u| u.user_id),
            user_phone: req.user_phone,
            user_name: req.user_name,
        })
        .await?;
    Ok(Json(lead))
}

/// GET /v1/offers/leads/business/{business_id}?status=&limit=&offset=
async fn business_leads(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<LeadPage>, AppError> {
    let page = state
        .leads
        .business_leads(business_id, params.status, params.limit, params.offset)
        .await?;
    Ok(Json(page))
}

/// PATCH /v1/offers/leads/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<OfferLead>, AppError> {
    Ok(Json(state.leads.update_lead_status(id, req.status).await?))
}

/// GET /v1/offers/leads/recent/{business_id}?limit=
async fn recent_interactions(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Interaction>>, AppError> {
    Ok(Json(state.leads.recent_interactions(business_id, params.limit).await?))
}
