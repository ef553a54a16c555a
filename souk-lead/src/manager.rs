use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use souk_core::repository::{BusinessLeadQuery, LeadRepository, RepoError};
use souk_shared::models::{CreateLeadRequest, Interaction, LeadPage, LeadStatus, OfferLead};
use souk_shared::Masked;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::interactions::merge_interactions;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_INTERACTIONS: i64 = 10;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LeadConfig {
    pub dedup_window_hours: i64,
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self { dedup_window_hours: 24 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("Invalid lead: {0}")]
    Validation(String),

    #[error("Offer not found: {0}")]
    OfferNotFound(Uuid),

    #[error("Lead not found: {0}")]
    LeadNotFound(Uuid),

    #[error("Invalid lead transition from {from} to {to}")]
    InvalidTransition { from: LeadStatus, to: LeadStatus },

    #[error("Lead store error: {0}")]
    Store(#[source] RepoError),
}

pub type LeadResult<T> = Result<T, LeadError>;

/// Captures contact leads and moves them through `new -> contacted -> converted`.
///
/// A repeat contact for the same offer and phone inside the dedup window
/// returns the existing lead without touching the click counter. The check
/// and the insert are separate store calls, so two simultaneous first
/// contacts can both insert.
pub struct LeadService {
    repo: Arc<dyn LeadRepository>,
    window: Duration,
}

impl LeadService {
    pub fn new(repo: Arc<dyn LeadRepository>, config: LeadConfig) -> Self {
        Self {
            repo,
            window: Duration::hours(config.dedup_window_hours),
        }
    }

    pub async fn create_lead(&self, request: CreateLeadRequest) -> LeadResult<OfferLead> {
        self.create_lead_at(request, Utc::now()).await
    }

    pub async fn create_lead_at(&self, request: CreateLeadRequest, now: DateTime<Utc>) -> LeadResult<OfferLead> {
        let phone = request.user_phone.trim();
        if phone.is_empty() {
            return Err(LeadError::Validation("user_phone is required".into()));
        }

        if !self.repo.offer_exists(request.offer_id).await.map_err(LeadError::Store)? {
            return Err(LeadError::OfferNotFound(request.offer_id));
        }

        let since = now - self.window;
        if let Some(existing) = self
            .repo
            .find_recent_lead(request.offer_id, phone, since)
            .await
            .map_err(LeadError::Store)?
        {
            debug!(
                lead_id = %existing.id,
                offer_id = %request.offer_id,
                phone = %Masked(phone),
                "Duplicate lead inside dedup window"
            );
            return Ok(existing);
        }

        let lead = OfferLead {
            id: Uuid::new_v4(),
            offer_id: request.offer_id,
            user_id: request.user_id,
            user_phone: phone.to_string(),
            user_name: request.user_name.filter(|n| !n.trim().is_empty()),
            status: LeadStatus::New,
            created_at: now,
            contacted_at: None,
        };
        self.repo.record_lead(&lead).await.map_err(LeadError::Store)?;

        info!(lead_id = %lead.id, offer_id = %lead.offer_id, phone = %Masked(phone), "Lead captured");
        Ok(lead)
    }

    pub async fn update_lead_status(&self, id: Uuid, status: LeadStatus) -> LeadResult<OfferLead> {
        self.update_lead_status_at(id, status, Utc::now()).await
    }

    /// Applies a forward transition. Re-applying the current status is a
    /// no-op; moving backwards is rejected.
    ///
    /// The store only writes when the stored status is still earlier than
    /// `status`, so a transition that lands concurrently is never undone.
    /// When it refuses, the stored lead decides the outcome.
    pub async fn update_lead_status_at(
        &self,
        id: Uuid,
        status: LeadStatus,
        now: DateTime<Utc>,
    ) -> LeadResult<OfferLead> {
        let stamp = status.marks_contact().then_some(now);
        if let Some(updated) = self
            .repo
            .advance_lead_status(id, status, stamp)
            .await
            .map_err(LeadError::Store)?
        {
            info!(lead_id = %id, to = %status, "Lead status updated");
            return Ok(updated);
        }

        let lead = self
            .repo
            .get_lead(id)
            .await
            .map_err(LeadError::Store)?
            .ok_or(LeadError::LeadNotFound(id))?;

        if lead.status == status {
            return Ok(lead);
        }
        Err(LeadError::InvalidTransition {
            from: lead.status,
            to: status,
        })
    }

    pub async fn business_leads(
        &self,
        business_id: Uuid,
        status: Option<LeadStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> LeadResult<LeadPage> {
        let query = BusinessLeadQuery {
            business_id,
            status,
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        };
        self.repo.list_business_leads(&query).await.map_err(LeadError::Store)
    }

    pub async fn recent_interactions(&self, business_id: Uuid, limit: Option<i64>) -> LeadResult<Vec<Interaction>> {
        let limit = limit.unwrap_or(DEFAULT_INTERACTIONS).clamp(1, MAX_PAGE_SIZE);
        let leads = self
            .repo
            .recent_leads(business_id, limit)
            .await
            .map_err(LeadError::Store)?;
        let views = self
            .repo
            .recent_views(business_id, limit)
            .await
            .map_err(LeadError::Store)?;
        Ok(merge_interactions(leads, views, limit as usize))
    }
}
