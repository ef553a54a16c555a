use std::sync::Arc;

use souk_catalog::{CacheError, CategoryCache};
use souk_core::repository::{
    CampaignRepository, CategoryRepository, DeviceTokenRepository, LeadRepository, OfferRepository,
};
use souk_core::NotificationDispatcher;
use souk_lead::{LeadConfig, LeadService};
use souk_offer::{CampaignCoordinator, FeedConfig, FeedPaginator};
use souk_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Request budget per client address and minute, enforced only when Redis is configured.
#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub per_minute: i64,
}

/// Repository handles the services are built from.
pub struct Repositories {
    pub categories: Arc<dyn CategoryRepository>,
    pub offers: Arc<dyn OfferRepository>,
    pub campaigns: Arc<dyn CampaignRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub devices: Arc<dyn DeviceTokenRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub categories: Arc<CategoryCache>,
    pub feed: Arc<FeedPaginator>,
    pub campaigns: Arc<CampaignCoordinator>,
    pub leads: Arc<LeadService>,
    pub devices: Arc<dyn DeviceTokenRepository>,
    pub rate_limit: Option<RateLimit>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wires the services together. Loads the category cache, so this fails
    /// when the category table cannot be read.
    pub async fn build(
        repos: Repositories,
        notifier: Arc<dyn NotificationDispatcher>,
        feed: FeedConfig,
        leads: LeadConfig,
        auth: AuthConfig,
        rate_limit: Option<RateLimit>,
    ) -> Result<Self, CacheError> {
        let categories = CategoryCache::load(repos.categories).await?;

        Ok(Self {
            categories: Arc::new(categories),
            feed: Arc::new(FeedPaginator::new(repos.offers, feed)),
            campaigns: Arc::new(CampaignCoordinator::new(repos.campaigns, notifier)),
            leads: Arc::new(LeadService::new(repos.leads, leads)),
            devices: repos.devices,
            rate_limit,
            auth,
        })
    }
}
