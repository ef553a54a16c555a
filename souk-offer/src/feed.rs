use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souk_core::repository::{FeedQuery, OfferRepository};
use souk_core::{CoreError, CoreResult};
use souk_shared::models::{FeedOffer, OfferDetail};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const HOT_DEALS_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedMeta {
    pub next_cursor: Option<Uuid>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedPage {
    pub data: Vec<FeedOffer>,
    pub meta: FeedMeta,
}

/// Keyset pagination over the public offer feed.
///
/// Each page is a fresh read: eligibility (`active`, inside its date window)
/// is evaluated at call time, and the page starts strictly after the cursor
/// row in `created_at DESC, id DESC` order, so rows inserted or expiring
/// between calls never shift the position the way an offset would.
pub struct FeedPaginator {
    repo: Arc<dyn OfferRepository>,
    config: FeedConfig,
}

impl FeedPaginator {
    pub fn new(repo: Arc<dyn OfferRepository>, config: FeedConfig) -> Self {
        Self { repo, config }
    }

    pub fn effective_limit(&self, limit: Option<i64>) -> i64 {
        limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1))
    }

    pub async fn get_page(&self, cursor: Option<Uuid>, limit: Option<i64>) -> CoreResult<FeedPage> {
        self.get_page_at(cursor, limit, Utc::now()).await
    }

    pub async fn get_page_at(
        &self,
        cursor: Option<Uuid>,
        limit: Option<i64>,
        now: DateTime<Utc>,
    ) -> CoreResult<FeedPage> {
        let limit = self.effective_limit(limit);
        let query = FeedQuery { now, cursor, limit };

        let data = self
            .repo
            .list_feed(&query)
            .await
            .map_err(CoreError::StoreError)?;

        // has_more is a heuristic: a full page says nothing about what is left.
        let meta = FeedMeta {
            next_cursor: data.last().map(|entry| entry.offer.id),
            has_more: data.len() as i64 == limit,
        };
        debug!(?cursor, limit, returned = data.len(), "Served feed page");

        Ok(FeedPage { data, meta })
    }

    pub async fn hot_deals(&self) -> CoreResult<Vec<FeedOffer>> {
        self.repo
            .list_hot_deals(Utc::now(), HOT_DEALS_LIMIT)
            .await
            .map_err(CoreError::StoreError)
    }

    pub async fn business_offers(&self, business_id: Uuid) -> CoreResult<Vec<FeedOffer>> {
        self.repo
            .list_business_offers(business_id)
            .await
            .map_err(CoreError::StoreError)
    }

    pub async fn get_offer(&self, id: Uuid) -> CoreResult<OfferDetail> {
        self.repo
            .get_offer_detail(id)
            .await
            .map_err(CoreError::StoreError)?
            .ok_or_else(|| CoreError::not_found("offer", id))
    }
}
