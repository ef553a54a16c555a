use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use souk_core::repository::{CampaignRepository, RepoResult, WriteUnit};
use souk_core::{CoreError, CoreResult, NotificationDispatcher};
use souk_shared::models::events::CampaignPublishedEvent;
use souk_shared::models::{
    Branch, Campaign, CampaignCreated, CampaignWithOffers, CreateCampaignRequest, CreateOfferRequest,
    CreatedOffer, Offer, OfferMedia, OfferMetrics, OfferStatus, RuleParams, RuleType,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::rules::normalize_rule;

/// Concurrent push requests per fan-out.
const FANOUT_CONCURRENCY: usize = 16;

/// Creates campaigns and offers as single all-or-nothing write units.
///
/// Everything is validated and every row is built before the unit is opened;
/// the unit is then either committed in full or rolled back. Follower
/// notifications are dispatched on a detached task after the commit and can
/// never fail the write.
pub struct CampaignCoordinator {
    repo: Arc<dyn CampaignRepository>,
    notifier: Arc<dyn NotificationDispatcher>,
}

/// Everything needed to create one offer.
struct OfferDraft<'a> {
    branch_id: Uuid,
    campaign_id: Option<Uuid>,
    title: &'a str,
    description: Option<&'a str>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    rule_type: RuleType,
    rules: &'a RuleParams,
    image_urls: &'a [String],
}

impl CampaignCoordinator {
    pub fn new(repo: Arc<dyn CampaignRepository>, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self { repo, notifier }
    }

    pub async fn create_campaign(
        &self,
        user_id: Uuid,
        request: CreateCampaignRequest,
    ) -> CoreResult<CampaignCreated> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(CoreError::ValidationError("campaign title is required".into()));
        }
        validate_window(request.start_date, request.end_date)?;
        if request.items.is_empty() {
            return Err(CoreError::ValidationError("a campaign needs at least one item".into()));
        }

        let business = self
            .repo
            .find_business_for_owner(user_id)
            .await
            .map_err(CoreError::StoreError)?
            .ok_or_else(|| CoreError::not_found("business for user", user_id))?;

        let branches = self
            .repo
            .list_branches(business.id)
            .await
            .map_err(CoreError::StoreError)?;
        let (branch_id, default_branch) = match branches
            .iter()
            .find(|b| b.is_active)
            .or(branches.first())
        {
            Some(branch) => (branch.id, None),
            None => {
                let branch = Branch::default_for(business.id);
                info!(business_id = %business.id, "Business has no branch, creating default branch");
                (branch.id, Some(branch))
            }
        };

        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            business_id: business.id,
            name: title.to_string(),
            start_date: request.start_date,
            end_date: request.end_date,
            created_by: user_id,
            created_at: now,
        };

        let offers = request
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                let name = item.name.trim();
                if name.is_empty() {
                    return Err(CoreError::ValidationError(format!(
                        "item {} needs a name",
                        position + 1
                    )));
                }
                build_offer(
                    OfferDraft {
                        branch_id,
                        campaign_id: Some(campaign.id),
                        title: name,
                        description: item.description.as_deref(),
                        start_date: campaign.start_date,
                        end_date: campaign.end_date,
                        rule_type: item.rule_type,
                        rules: &item.rules,
                        image_urls: &item.image_urls,
                    },
                    user_id,
                    now,
                )
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let mut unit = self.repo.begin().await.map_err(CoreError::TransactionFailed)?;
        let written = write_campaign(unit.as_mut(), default_branch.as_ref(), &campaign, &offers).await;
        finish(unit, written).await?;

        info!(
            campaign_id = %campaign.id,
            business_id = %business.id,
            offers = offers.len(),
            "Campaign created"
        );

        self.spawn_follower_fanout(CampaignPublishedEvent {
            campaign_id: campaign.id,
            business_id: business.id,
            business_name: business.business_name.clone(),
            campaign_name: campaign.name.clone(),
            offer_count: offers.len(),
            timestamp: now.timestamp(),
        });

        Ok(CampaignCreated {
            campaign,
            offers,
            default_branch,
        })
    }

    /// Creates a standalone offer on an existing branch.
    pub async fn create_offer(&self, user_id: Uuid, request: CreateOfferRequest) -> CoreResult<CreatedOffer> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(CoreError::ValidationError("offer title is required".into()));
        }
        validate_window(request.start_date, request.end_date)?;

        let branch = self
            .repo
            .find_branch(request.branch_id)
            .await
            .map_err(CoreError::StoreError)?
            .ok_or_else(|| CoreError::not_found("branch", request.branch_id))?;

        let created = build_offer(
            OfferDraft {
                branch_id: branch.id,
                campaign_id: None,
                title,
                description: request.description.as_deref(),
                start_date: request.start_date,
                end_date: request.end_date,
                rule_type: request.rule_type,
                rules: &request.rules,
                image_urls: &request.image_urls,
            },
            user_id,
            Utc::now(),
        )?;

        let mut unit = self.repo.begin().await.map_err(CoreError::TransactionFailed)?;
        let written = write_offer(unit.as_mut(), &created).await;
        finish(unit, written).await?;

        info!(offer_id = %created.offer.id, branch_id = %branch.id, "Offer created");
        Ok(created)
    }

    pub async fn get_campaign(&self, id: Uuid) -> CoreResult<CampaignWithOffers> {
        let campaign = self
            .repo
            .get_campaign(id)
            .await
            .map_err(CoreError::StoreError)?
            .ok_or_else(|| CoreError::not_found("campaign", id))?;
        let offers = self
            .repo
            .list_campaign_offers(id)
            .await
            .map_err(CoreError::StoreError)?;
        Ok(CampaignWithOffers { campaign, offers })
    }

    /// Pauses an active offer or resumes a paused one. Paused offers drop out
    /// of the feed on its next read.
    pub async fn toggle_offer_status(&self, offer_id: Uuid) -> CoreResult<Offer> {
        let offer = self
            .repo
            .toggle_offer_status(offer_id)
            .await
            .map_err(CoreError::StoreError)?
            .ok_or_else(|| CoreError::not_found("offer", offer_id))?;

        info!(%offer_id, status = %offer.status, "Offer status toggled");
        Ok(offer)
    }

    fn spawn_follower_fanout(&self, event: CampaignPublishedEvent) -> JoinHandle<usize> {
        let repo = Arc::clone(&self.repo);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move { notify_followers(repo.as_ref(), notifier.as_ref(), &event).await })
    }
}

/// Pushes `event` to every follower of the business. Each delivery stands
/// alone; failures are logged and counted out. Returns the number delivered.
pub async fn notify_followers(
    repo: &dyn CampaignRepository,
    notifier: &dyn NotificationDispatcher,
    event: &CampaignPublishedEvent,
) -> usize {
    let followers = match repo.list_follower_ids(event.business_id).await {
        Ok(followers) => followers,
        Err(e) => {
            warn!(business_id = %event.business_id, error = %e, "Could not load followers, skipping push");
            return 0;
        }
    };
    if followers.is_empty() {
        return 0;
    }

    let title = event.push_title();
    let body = event.push_body();
    let data = event.push_data();
    let total = followers.len();

    let delivered = stream::iter(followers)
        .map(|user_id| {
            let (title, body, data) = (&title, &body, &data);
            async move {
                match notifier.send(user_id, title, body, data).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(%user_id, campaign_id = %event.campaign_id, error = %e, "Push to follower failed");
                        false
                    }
                }
            }
        })
        .buffer_unordered(FANOUT_CONCURRENCY)
        .filter(|ok| futures_util::future::ready(*ok))
        .count()
        .await;

    info!(campaign_id = %event.campaign_id, delivered, total, "Follower fan-out finished");
    delivered
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<()> {
    if start >= end {
        return Err(CoreError::ValidationError("start_date must be before end_date".into()));
    }
    Ok(())
}

fn build_offer(draft: OfferDraft<'_>, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<CreatedOffer> {
    let offer = Offer {
        id: Uuid::new_v4(),
        branch_id: draft.branch_id,
        campaign_id: draft.campaign_id,
        title: draft.title.to_string(),
        description: draft
            .description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        status: OfferStatus::Active,
        start_date: draft.start_date,
        end_date: draft.end_date,
        created_by: user_id,
        created_at: now,
    };
    let rule = normalize_rule(offer.id, draft.rule_type, draft.rules)?;
    let media = draft
        .image_urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .enumerate()
        .map(|(sort_order, url)| OfferMedia {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            image_url: url.to_string(),
            sort_order: sort_order as i32,
        })
        .collect();

    Ok(CreatedOffer { offer, rule, media })
}

async fn write_campaign(
    unit: &mut dyn WriteUnit,
    default_branch: Option<&Branch>,
    campaign: &Campaign,
    offers: &[CreatedOffer],
) -> RepoResult<()> {
    if let Some(branch) = default_branch {
        unit.insert_branch(branch).await?;
    }
    unit.insert_campaign(campaign).await?;
    for created in offers {
        write_offer(unit, created).await?;
    }
    Ok(())
}

async fn write_offer(unit: &mut dyn WriteUnit, created: &CreatedOffer) -> RepoResult<()> {
    unit.insert_offer(&created.offer).await?;
    unit.insert_rule(&created.rule).await?;
    for media in &created.media {
        unit.insert_media(media).await?;
    }
    unit.insert_metrics(&OfferMetrics::zeroed(created.offer.id, created.offer.created_at))
        .await
}

/// Commits the unit if every write succeeded, otherwise rolls it back.
async fn finish(unit: Box<dyn WriteUnit>, written: RepoResult<()>) -> CoreResult<()> {
    match written {
        Ok(()) => unit.commit().await.map_err(|e| {
            error!(error = %e, "Commit failed");
            CoreError::TransactionFailed(e)
        }),
        Err(e) => {
            error!(error = %e, "Write unit failed, rolling back");
            if let Err(rollback) = unit.rollback().await {
                warn!(error = %rollback, "Rollback failed; the unit is discarded on drop");
            }
            Err(CoreError::TransactionFailed(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use souk_core::NotifyError;
    use souk_shared::models::{Business, CampaignItem};
    use souk_store::memory::{FailPoint, MemoryStore};
    use tokio::sync::mpsc;

    /// Records deliveries on a channel; fails for the listed users.
    struct RecordingDispatcher {
        delivered: mpsc::UnboundedSender<Uuid>,
        failing: Vec<Uuid>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn send(&self, user_id: Uuid, _title: &str, _body: &str, _data: &serde_json::Value) -> Result<(), NotifyError> {
            if self.failing.contains(&user_id) {
                return Err(NotifyError::Transport("connection refused".into()));
            }
            let _ = self.delivered.send(user_id);
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        owner: Uuid,
        business: Business,
        coordinator: CampaignCoordinator,
        delivered: mpsc::UnboundedReceiver<Uuid>,
    }

    fn fixture(failing: Vec<Uuid>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let business = Business {
            id: Uuid::new_v4(),
            owner_id: owner,
            business_name: "Sharma Sweets".to_string(),
            logo_url: None,
            created_at: Utc::now(),
        };
        store.seed_business(business.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(RecordingDispatcher { delivered: tx, failing });
        let coordinator = CampaignCoordinator::new(store.clone(), dispatcher);
        Fixture { store, owner, business, coordinator, delivered: rx }
    }

    fn diwali_request() -> CreateCampaignRequest {
        let start = Utc::now();
        CreateCampaignRequest {
            title: "Diwali Sale".to_string(),
            start_date: start,
            end_date: start + Duration::days(7),
            items: vec![
                CampaignItem {
                    name: "Item A".to_string(),
                    description: None,
                    rule_type: RuleType::Percentage,
                    rules: RuleParams { discount_value: Some(30.0), ..RuleParams::default() },
                    image_urls: vec!["https://cdn.example.com/a.jpg".to_string()],
                },
                CampaignItem {
                    name: "Item B".to_string(),
                    description: None,
                    rule_type: RuleType::Bogo,
                    rules: RuleParams::default(),
                    image_urls: vec![],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_diwali_campaign_creates_default_branch_and_offers() {
        let fx = fixture(vec![]);

        let created = fx.coordinator.create_campaign(fx.owner, diwali_request()).await.unwrap();

        let branch = created.default_branch.clone().expect("default branch");
        assert_eq!(branch.branch_name, "Main Branch");
        assert_eq!(fx.store.branch_count(fx.business.id), 1);
        assert_eq!(created.offers.len(), 2);
        for created_offer in &created.offers {
            assert_eq!(created_offer.offer.status, OfferStatus::Active);
            assert_eq!(created_offer.offer.branch_id, branch.id);
            assert_eq!(created_offer.offer.campaign_id, Some(created.campaign.id));
            assert_eq!(created_offer.rule.offer_id, created_offer.offer.id);
        }
        assert_eq!(created.offers[0].rule.discount_value, Some(30.0));
        assert_eq!(created.offers[0].media.len(), 1);
        assert_eq!(created.offers[1].rule.rule_type, RuleType::Bogo);

        let stored = fx.coordinator.get_campaign(created.campaign.id).await.unwrap();
        assert_eq!(stored.campaign.name, "Diwali Sale");
        assert_eq!(stored.offers.len(), 2);
        assert!(fx.store.metrics_for(created.offers[1].offer.id).is_some());
    }

    #[tokio::test]
    async fn test_existing_branch_is_reused() {
        let fx = fixture(vec![]);
        let branch = Branch::default_for(fx.business.id);
        fx.store.seed_branch(branch.clone());

        let created = fx.coordinator.create_campaign(fx.owner, diwali_request()).await.unwrap();

        assert!(created.default_branch.is_none());
        assert!(created.offers.iter().all(|o| o.offer.branch_id == branch.id));
        assert_eq!(fx.store.branch_count(fx.business.id), 1);
    }

    #[tokio::test]
    async fn test_failing_rule_leaves_nothing_behind() {
        let fx = fixture(vec![]);
        fx.store.fail_at(FailPoint::InsertRule, 2);

        let err = fx.coordinator.create_campaign(fx.owner, diwali_request()).await.unwrap_err();

        assert!(matches!(err, CoreError::TransactionFailed(_)));
        assert_eq!(fx.store.campaign_count(), 0);
        assert_eq!(fx.store.offer_count(), 0);
        assert_eq!(fx.store.rule_count(), 0);
        assert_eq!(fx.store.branch_count(fx.business.id), 0);
    }

    #[tokio::test]
    async fn test_rolled_back_campaign_reads_as_not_found() {
        let fx = fixture(vec![]);
        fx.store.fail_at(FailPoint::InsertMedia, 1);

        assert!(fx.coordinator.create_campaign(fx.owner, diwali_request()).await.is_err());

        // The id handed to the failed unit was never visible.
        let attempted = fx.store.last_attempted_campaign().expect("campaign was attempted");
        let err = fx.coordinator.get_campaign(attempted).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "campaign", .. }));
    }

    #[tokio::test]
    async fn test_user_without_business_fails_before_any_write() {
        let fx = fixture(vec![]);

        let err = fx.coordinator.create_campaign(Uuid::new_v4(), diwali_request()).await.unwrap_err();

        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(fx.store.units_opened(), 0);
    }

    #[tokio::test]
    async fn test_invalid_item_rejected_before_any_write() {
        let fx = fixture(vec![]);
        let mut request = diwali_request();
        request.items[0].rules = RuleParams::default(); // percentage without a value

        let err = fx.coordinator.create_campaign(fx.owner, request).await.unwrap_err();

        assert!(matches!(err, CoreError::ValidationError(_)));
        assert_eq!(fx.store.units_opened(), 0);
    }

    #[tokio::test]
    async fn test_window_and_items_validated() {
        let fx = fixture(vec![]);
        let mut backwards = diwali_request();
        backwards.end_date = backwards.start_date - Duration::hours(1);
        assert!(matches!(
            fx.coordinator.create_campaign(fx.owner, backwards).await,
            Err(CoreError::ValidationError(_))
        ));

        let mut empty = diwali_request();
        empty.items.clear();
        assert!(matches!(
            fx.coordinator.create_campaign(fx.owner, empty).await,
            Err(CoreError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_followers_notified_and_failures_isolated() {
        let failing_follower = Uuid::new_v4();
        let mut fx = fixture(vec![failing_follower]);
        let followers = [Uuid::new_v4(), failing_follower, Uuid::new_v4()];
        for follower in followers {
            fx.store.seed_follower(follower, fx.business.id);
        }

        let created = fx.coordinator.create_campaign(fx.owner, diwali_request()).await;
        assert!(created.is_ok());

        let mut got = Vec::new();
        for _ in 0..2 {
            let user = tokio::time::timeout(std::time::Duration::from_secs(2), fx.delivered.recv())
                .await
                .expect("push delivered")
                .expect("channel open");
            got.push(user);
        }
        got.sort();
        let mut expected = vec![followers[0], followers[2]];
        expected.sort();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_notify_followers_counts_deliveries() {
        let failing = Uuid::new_v4();
        let fx = fixture(vec![failing]);
        fx.store.seed_follower(Uuid::new_v4(), fx.business.id);
        fx.store.seed_follower(failing, fx.business.id);
        let (tx, _rx) = mpsc::unbounded_channel();
        let dispatcher = RecordingDispatcher { delivered: tx, failing: vec![failing] };
        let event = CampaignPublishedEvent {
            campaign_id: Uuid::new_v4(),
            business_id: fx.business.id,
            business_name: fx.business.business_name.clone(),
            campaign_name: "Weekend".to_string(),
            offer_count: 1,
            timestamp: 0,
        };

        let delivered = notify_followers(fx.store.as_ref(), &dispatcher, &event).await;

        assert_eq!(delivered, 1);
        assert_eq!(event.push_data()["type"], json!("campaign"));
    }

    #[tokio::test]
    async fn test_single_offer_requires_existing_branch() {
        let fx = fixture(vec![]);
        let now = Utc::now();
        let request = CreateOfferRequest {
            branch_id: Uuid::new_v4(),
            title: "Flat 200 off".to_string(),
            description: Some("On orders above 999".to_string()),
            start_date: now,
            end_date: now + Duration::days(30),
            rule_type: RuleType::Flat,
            rules: RuleParams { discount_value: Some(200.0), min_purchase_amount: Some(999.0), ..RuleParams::default() },
            image_urls: vec![],
        };

        let err = fx.coordinator.create_offer(fx.owner, request.clone()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "branch", .. }));

        let branch = Branch::default_for(fx.business.id);
        fx.store.seed_branch(branch.clone());
        let created = fx
            .coordinator
            .create_offer(fx.owner, CreateOfferRequest { branch_id: branch.id, ..request })
            .await
            .unwrap();
        assert_eq!(created.offer.campaign_id, None);
        assert_eq!(created.rule.min_purchase_amount, Some(999.0));
        assert_eq!(fx.store.offer_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_pauses_then_resumes() {
        let fx = fixture(vec![]);
        let created = fx.coordinator.create_campaign(fx.owner, diwali_request()).await.unwrap();
        let offer_id = created.offers[0].offer.id;

        let paused = fx.coordinator.toggle_offer_status(offer_id).await.unwrap();
        assert_eq!(paused.status, OfferStatus::Paused);

        let resumed = fx.coordinator.toggle_offer_status(offer_id).await.unwrap();
        assert_eq!(resumed.status, OfferStatus::Active);

        let err = fx.coordinator.toggle_offer_status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "offer", .. }));
    }
}
