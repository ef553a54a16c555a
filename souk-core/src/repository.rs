use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souk_shared::models::{
    Branch, Business, Campaign, Category, DeviceToken, FeedOffer, LeadPage, LeadStatus,
    LeadWithOffer, Offer, OfferDetail, OfferLead, OfferMedia, OfferMetrics, OfferRule, OfferView,
};
use uuid::Uuid;

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;
pub type RepoResult<T> = Result<T, RepoError>;

/// Repository trait for the category table
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All active categories, ordered by name.
    async fn list_active_categories(&self) -> RepoResult<Vec<Category>>;
}

/// Keyset position and size of one feed page.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub now: DateTime<Utc>,
    /// Id of the last offer already served; the page starts strictly after it.
    pub cursor: Option<Uuid>,
    pub limit: i64,
}

/// Repository trait for offer listings
#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Offers visible at `query.now`, ordered by `created_at DESC, id DESC`.
    async fn list_feed(&self, query: &FeedQuery) -> RepoResult<Vec<FeedOffer>>;

    async fn list_hot_deals(&self, now: DateTime<Utc>, limit: i64) -> RepoResult<Vec<FeedOffer>>;

    async fn list_business_offers(&self, business_id: Uuid) -> RepoResult<Vec<FeedOffer>>;

    async fn get_offer_detail(&self, id: Uuid) -> RepoResult<Option<OfferDetail>>;
}

/// Repository trait for campaign and offer creation
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Oldest business owned by `owner_id`.
    async fn find_business_for_owner(&self, owner_id: Uuid) -> RepoResult<Option<Business>>;

    async fn find_branch(&self, branch_id: Uuid) -> RepoResult<Option<Branch>>;

    async fn list_branches(&self, business_id: Uuid) -> RepoResult<Vec<Branch>>;

    async fn list_follower_ids(&self, business_id: Uuid) -> RepoResult<Vec<Uuid>>;

    async fn get_campaign(&self, id: Uuid) -> RepoResult<Option<Campaign>>;

    async fn list_campaign_offers(&self, campaign_id: Uuid) -> RepoResult<Vec<Offer>>;

    /// Flips an offer between `active` and `paused` in one statement, so two
    /// concurrent toggles never both land on the same status.
    async fn toggle_offer_status(&self, offer_id: Uuid) -> RepoResult<Option<Offer>>;

    /// Opens a write unit. Nothing written through it is visible until `commit`.
    async fn begin(&self) -> RepoResult<Box<dyn WriteUnit>>;
}

/// One transactional unit of writes. Dropping it without `commit` discards every write.
#[async_trait]
pub trait WriteUnit: Send {
    async fn insert_branch(&mut self, branch: &Branch) -> RepoResult<()>;

    async fn insert_campaign(&mut self, campaign: &Campaign) -> RepoResult<()>;

    async fn insert_offer(&mut self, offer: &Offer) -> RepoResult<()>;

    async fn insert_rule(&mut self, rule: &OfferRule) -> RepoResult<()>;

    async fn insert_media(&mut self, media: &OfferMedia) -> RepoResult<()>;

    async fn insert_metrics(&mut self, metrics: &OfferMetrics) -> RepoResult<()>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;

    async fn rollback(self: Box<Self>) -> RepoResult<()>;
}

#[derive(Debug, Clone)]
pub struct BusinessLeadQuery {
    pub business_id: Uuid,
    pub status: Option<LeadStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository trait for contact leads
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn offer_exists(&self, offer_id: Uuid) -> RepoResult<bool>;

    /// Most recent lead for `(offer_id, phone)` created at or after `since`.
    async fn find_recent_lead(
        &self,
        offer_id: Uuid,
        phone: &str,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<OfferLead>>;

    /// Inserts the lead and upserts the offer's click counter in one transaction.
    async fn record_lead(&self, lead: &OfferLead) -> RepoResult<()>;

    async fn get_lead(&self, id: Uuid) -> RepoResult<Option<OfferLead>>;

    /// Moves the lead to `status` only if its stored status is strictly
    /// earlier, keeping an existing `contacted_at` over `contacted_at`. The
    /// check and the write are one statement. `None` when nothing changed.
    async fn advance_lead_status(
        &self,
        id: Uuid,
        status: LeadStatus,
        contacted_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Option<OfferLead>>;

    async fn list_business_leads(&self, query: &BusinessLeadQuery) -> RepoResult<LeadPage>;

    async fn recent_leads(&self, business_id: Uuid, limit: i64) -> RepoResult<Vec<LeadWithOffer>>;

    async fn recent_views(&self, business_id: Uuid, limit: i64) -> RepoResult<Vec<OfferView>>;

    async fn get_metrics(&self, offer_id: Uuid) -> RepoResult<Option<OfferMetrics>>;
}

/// Repository trait for push device tokens
#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    async fn upsert_token(&self, user_id: Uuid, token: &str, platform: &str) -> RepoResult<DeviceToken>;

    async fn list_tokens(&self, user_id: Uuid) -> RepoResult<Vec<DeviceToken>>;

    /// Returns the number of tokens removed.
    async fn delete_tokens(&self, tokens: &[String]) -> RepoResult<u64>;
}
