//! In-memory implementation of every repository trait, for tests and local
//! runs without Postgres. Write units stage their rows and only apply them on
//! commit; faults can be injected on any insert to exercise rollback paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souk_core::repository::{
    BusinessLeadQuery, CampaignRepository, CategoryRepository, DeviceTokenRepository, FeedQuery,
    LeadRepository, OfferRepository, RepoResult, WriteUnit,
};
use souk_shared::models::{
    Branch, Business, BusinessSummary, Campaign, Category, DeviceToken, FeedOffer, LeadPage,
    LeadPageMeta, LeadStatus, LeadWithOffer, Offer, OfferDetail, OfferLead, OfferMedia,
    OfferMetrics, OfferRule, OfferStatus, OfferView, RuleSummary,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Write-unit operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertBranch,
    InsertCampaign,
    InsertOffer,
    InsertRule,
    InsertMedia,
    InsertMetrics,
    Commit,
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    businesses: Vec<Business>,
    branches: Vec<Branch>,
    followers: Vec<(Uuid, Uuid)>,
    campaigns: Vec<Campaign>,
    offers: Vec<Offer>,
    rules: Vec<OfferRule>,
    media: Vec<OfferMedia>,
    metrics: HashMap<Uuid, OfferMetrics>,
    leads: Vec<OfferLead>,
    views: Vec<StoredView>,
    tokens: Vec<DeviceToken>,
}

struct StoredView {
    offer_id: Uuid,
    user_name: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    /// Fail the nth (1-based) call of an operation within each write unit.
    faults: Mutex<HashMap<FailPoint, usize>>,
    fail_category_reads: AtomicBool,
    units_opened: AtomicUsize,
    last_campaign: Mutex<Option<Uuid>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Tables {
    fn business_of_branch(&self, branch_id: Uuid) -> Option<(&Business, &Branch)> {
        let branch = self.branches.iter().find(|b| b.id == branch_id)?;
        let business = self.businesses.iter().find(|b| b.id == branch.business_id)?;
        Some((business, branch))
    }

    fn summary(&self, offer: &Offer) -> Option<BusinessSummary> {
        let (business, branch) = self.business_of_branch(offer.branch_id)?;
        Some(BusinessSummary {
            business_id: business.id,
            business_name: business.business_name.clone(),
            logo_url: business.logo_url.clone(),
            city: branch.city.clone(),
        })
    }

    fn media_of(&self, offer_id: Uuid) -> Vec<OfferMedia> {
        let mut media: Vec<OfferMedia> = self.media.iter().filter(|m| m.offer_id == offer_id).cloned().collect();
        media.sort_by_key(|m| (m.sort_order, m.id));
        media
    }

    fn listing(&self, offer: &Offer) -> Option<FeedOffer> {
        let business = self.summary(offer)?;
        let rule = self.rules.iter().find(|r| r.offer_id == offer.id).map(|r| RuleSummary {
            rule_type: r.rule_type,
            discount_value: r.discount_value,
        });
        Some(FeedOffer {
            offer: offer.clone(),
            business,
            thumbnail: self.media_of(offer.id).into_iter().next(),
            rule,
        })
    }

    fn offer_business(&self, offer_id: Uuid) -> Option<(&Offer, Uuid)> {
        let offer = self.offers.iter().find(|o| o.id == offer_id)?;
        let (business, _) = self.business_of_branch(offer.branch_id)?;
        Some((offer, business.id))
    }

    fn business_leads(&self, business_id: Uuid) -> Vec<LeadWithOffer> {
        let mut leads: Vec<LeadWithOffer> = self
            .leads
            .iter()
            .filter_map(|lead| {
                let (offer, owner) = self.offer_business(lead.offer_id)?;
                (owner == business_id).then(|| LeadWithOffer {
                    lead: lead.clone(),
                    offer_title: offer.title.clone(),
                })
            })
            .collect();
        leads.sort_by(|a, b| (b.lead.created_at, b.lead.id).cmp(&(a.lead.created_at, a.lead.id)));
        leads
    }
}

fn newest_first(offers: &mut [&Offer]) {
    offers.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        lock(&self.inner.tables)
    }

    pub fn seed_category(&self, category: Category) {
        self.tables().categories.push(category);
    }

    pub fn seed_business(&self, business: Business) {
        self.tables().businesses.push(business);
    }

    pub fn seed_branch(&self, branch: Branch) {
        self.tables().branches.push(branch);
    }

    pub fn seed_offer(&self, offer: Offer) {
        self.tables().offers.push(offer);
    }

    pub fn seed_rule(&self, rule: OfferRule) {
        self.tables().rules.push(rule);
    }

    pub fn seed_media(&self, media: OfferMedia) {
        self.tables().media.push(media);
    }

    pub fn seed_follower(&self, user_id: Uuid, business_id: Uuid) {
        self.tables().followers.push((user_id, business_id));
    }

    pub fn seed_view(&self, offer_id: Uuid, user_name: Option<&str>, at: DateTime<Utc>) {
        self.tables().views.push(StoredView {
            offer_id,
            user_name: user_name.map(str::to_string),
            created_at: at,
        });
    }

    /// Makes the `nth` call of `point` fail in every write unit opened afterwards.
    pub fn fail_at(&self, point: FailPoint, nth: usize) {
        lock(&self.inner.faults).insert(point, nth);
    }

    pub fn fail_category_reads(&self, fail: bool) {
        self.inner.fail_category_reads.store(fail, Ordering::SeqCst);
    }

    pub fn units_opened(&self) -> usize {
        self.inner.units_opened.load(Ordering::SeqCst)
    }

    /// Id of the last campaign handed to a write unit, committed or not.
    pub fn last_attempted_campaign(&self) -> Option<Uuid> {
        *lock(&self.inner.last_campaign)
    }

    pub fn branch_count(&self, business_id: Uuid) -> usize {
        self.tables().branches.iter().filter(|b| b.business_id == business_id).count()
    }

    pub fn campaign_count(&self) -> usize {
        self.tables().campaigns.len()
    }

    pub fn offer_count(&self) -> usize {
        self.tables().offers.len()
    }

    pub fn rule_count(&self) -> usize {
        self.tables().rules.len()
    }

    pub fn lead_count(&self) -> usize {
        self.tables().leads.len()
    }

    /// Leads on `offer_id` in insertion order.
    pub fn leads_for(&self, offer_id: Uuid) -> Vec<OfferLead> {
        self.tables().leads.iter().filter(|l| l.offer_id == offer_id).cloned().collect()
    }

    pub fn metrics_for(&self, offer_id: Uuid) -> Option<OfferMetrics> {
        self.tables().metrics.get(&offer_id).cloned()
    }

    pub fn tokens_for(&self, user_id: Uuid) -> Vec<String> {
        self.tables()
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.token.clone())
            .collect()
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list_active_categories(&self) -> RepoResult<Vec<Category>> {
        if self.inner.fail_category_reads.load(Ordering::SeqCst) {
            return Err("category table unavailable".into());
        }
        let mut rows: Vec<Category> = self.tables().categories.iter().filter(|c| c.is_active).cloned().collect();
        rows.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(rows)
    }
}

#[async_trait]
impl OfferRepository for MemoryStore {
    async fn list_feed(&self, query: &FeedQuery) -> RepoResult<Vec<FeedOffer>> {
        let tables = self.tables();
        let position = match query.cursor {
            Some(cursor) => match tables.offers.iter().find(|o| o.id == cursor) {
                Some(row) => Some((row.created_at, row.id)),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut eligible: Vec<&Offer> = tables
            .offers
            .iter()
            .filter(|o| o.is_visible_at(query.now))
            .filter(|o| position.is_none_or(|after| (o.created_at, o.id) < after))
            .collect();
        newest_first(&mut eligible);

        Ok(eligible
            .into_iter()
            .filter_map(|o| tables.listing(o))
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn list_hot_deals(&self, now: DateTime<Utc>, limit: i64) -> RepoResult<Vec<FeedOffer>> {
        self.list_feed(&FeedQuery { now, cursor: None, limit }).await
    }

    async fn list_business_offers(&self, business_id: Uuid) -> RepoResult<Vec<FeedOffer>> {
        let tables = self.tables();
        let mut offers: Vec<&Offer> = tables
            .offers
            .iter()
            .filter(|o| o.status == OfferStatus::Active)
            .filter(|o| tables.business_of_branch(o.branch_id).is_some_and(|(b, _)| b.id == business_id))
            .collect();
        newest_first(&mut offers);

        Ok(offers.into_iter().filter_map(|o| tables.listing(o)).collect())
    }

    async fn get_offer_detail(&self, id: Uuid) -> RepoResult<Option<OfferDetail>> {
        let tables = self.tables();
        let Some(offer) = tables.offers.iter().find(|o| o.id == id) else {
            return Ok(None);
        };
        let Some(business) = tables.summary(offer) else {
            return Ok(None);
        };
        Ok(Some(OfferDetail {
            offer: offer.clone(),
            business,
            rule: tables.rules.iter().find(|r| r.offer_id == id).cloned(),
            media: tables.media_of(id),
            metrics: tables.metrics.get(&id).cloned(),
        }))
    }
}

#[async_trait]
impl CampaignRepository for MemoryStore {
    async fn find_business_for_owner(&self, owner_id: Uuid) -> RepoResult<Option<Business>> {
        Ok(self
            .tables()
            .businesses
            .iter()
            .filter(|b| b.owner_id == owner_id)
            .min_by_key(|b| (b.created_at, b.id))
            .cloned())
    }

    async fn find_branch(&self, branch_id: Uuid) -> RepoResult<Option<Branch>> {
        Ok(self.tables().branches.iter().find(|b| b.id == branch_id).cloned())
    }

    async fn list_branches(&self, business_id: Uuid) -> RepoResult<Vec<Branch>> {
        Ok(self
            .tables()
            .branches
            .iter()
            .filter(|b| b.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn list_follower_ids(&self, business_id: Uuid) -> RepoResult<Vec<Uuid>> {
        Ok(self
            .tables()
            .followers
            .iter()
            .filter(|(_, b)| *b == business_id)
            .map(|(u, _)| *u)
            .collect())
    }

    async fn get_campaign(&self, id: Uuid) -> RepoResult<Option<Campaign>> {
        Ok(self.tables().campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn list_campaign_offers(&self, campaign_id: Uuid) -> RepoResult<Vec<Offer>> {
        let mut offers: Vec<Offer> = self
            .tables()
            .offers
            .iter()
            .filter(|o| o.campaign_id == Some(campaign_id))
            .cloned()
            .collect();
        offers.sort_by_key(|o| (o.created_at, o.id));
        Ok(offers)
    }

    async fn toggle_offer_status(&self, offer_id: Uuid) -> RepoResult<Option<Offer>> {
        let mut tables = self.tables();
        Ok(tables.offers.iter_mut().find(|o| o.id == offer_id).map(|offer| {
            offer.status = offer.status.toggled();
            offer.clone()
        }))
    }

    async fn begin(&self) -> RepoResult<Box<dyn WriteUnit>> {
        self.inner.units_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryWriteUnit {
            inner: Arc::clone(&self.inner),
            faults: lock(&self.inner.faults).clone(),
            calls: HashMap::new(),
            staged: Tables::default(),
        }))
    }
}

/// Stages rows until commit; dropping it discards them.
pub struct MemoryWriteUnit {
    inner: Arc<Inner>,
    faults: HashMap<FailPoint, usize>,
    calls: HashMap<FailPoint, usize>,
    staged: Tables,
}

impl MemoryWriteUnit {
    fn check(&mut self, point: FailPoint) -> RepoResult<()> {
        let count = self.calls.entry(point).or_insert(0);
        *count += 1;
        let call = *count;
        if self.faults.get(&point) == Some(&call) {
            return Err(format!("injected failure at {point:?} call {call}").into());
        }
        Ok(())
    }
}

#[async_trait]
impl WriteUnit for MemoryWriteUnit {
    async fn insert_branch(&mut self, branch: &Branch) -> RepoResult<()> {
        self.check(FailPoint::InsertBranch)?;
        self.staged.branches.push(branch.clone());
        Ok(())
    }

    async fn insert_campaign(&mut self, campaign: &Campaign) -> RepoResult<()> {
        *lock(&self.inner.last_campaign) = Some(campaign.id);
        self.check(FailPoint::InsertCampaign)?;
        self.staged.campaigns.push(campaign.clone());
        Ok(())
    }

    async fn insert_offer(&mut self, offer: &Offer) -> RepoResult<()> {
        self.check(FailPoint::InsertOffer)?;
        self.staged.offers.push(offer.clone());
        Ok(())
    }

    async fn insert_rule(&mut self, rule: &OfferRule) -> RepoResult<()> {
        self.check(FailPoint::InsertRule)?;
        self.staged.rules.push(rule.clone());
        Ok(())
    }

    async fn insert_media(&mut self, media: &OfferMedia) -> RepoResult<()> {
        self.check(FailPoint::InsertMedia)?;
        self.staged.media.push(media.clone());
        Ok(())
    }

    async fn insert_metrics(&mut self, metrics: &OfferMetrics) -> RepoResult<()> {
        self.check(FailPoint::InsertMetrics)?;
        self.staged.metrics.insert(metrics.offer_id, metrics.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> RepoResult<()> {
        self.check(FailPoint::Commit)?;
        let staged = std::mem::take(&mut self.staged);
        let mut tables = lock(&self.inner.tables);
        tables.branches.extend(staged.branches);
        tables.campaigns.extend(staged.campaigns);
        tables.offers.extend(staged.offers);
        tables.rules.extend(staged.rules);
        tables.media.extend(staged.media);
        for (offer_id, metrics) in staged.metrics {
            tables.metrics.entry(offer_id).or_insert(metrics);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn offer_exists(&self, offer_id: Uuid) -> RepoResult<bool> {
        Ok(self.tables().offers.iter().any(|o| o.id == offer_id))
    }

    async fn find_recent_lead(
        &self,
        offer_id: Uuid,
        phone: &str,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<OfferLead>> {
        Ok(self
            .tables()
            .leads
            .iter()
            .filter(|l| l.offer_id == offer_id && l.user_phone == phone && l.created_at >= since)
            .max_by_key(|l| l.created_at)
            .cloned())
    }

    async fn record_lead(&self, lead: &OfferLead) -> RepoResult<()> {
        let mut tables = self.tables();
        tables.leads.push(lead.clone());
        let metrics = tables
            .metrics
            .entry(lead.offer_id)
            .or_insert_with(|| OfferMetrics::zeroed(lead.offer_id, lead.created_at));
        metrics.clicks += 1;
        metrics.last_updated = Utc::now();
        Ok(())
    }

    async fn get_lead(&self, id: Uuid) -> RepoResult<Option<OfferLead>> {
        Ok(self.tables().leads.iter().find(|l| l.id == id).cloned())
    }

    async fn advance_lead_status(
        &self,
        id: Uuid,
        status: LeadStatus,
        contacted_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Option<OfferLead>> {
        let mut tables = self.tables();
        let Some(lead) = tables.leads.iter_mut().find(|l| l.id == id && l.status < status) else {
            return Ok(None);
        };
        lead.status = status;
        lead.contacted_at = lead.contacted_at.or(contacted_at);
        Ok(Some(lead.clone()))
    }

    async fn list_business_leads(&self, query: &BusinessLeadQuery) -> RepoResult<LeadPage> {
        let all = self.tables().business_leads(query.business_id);
        let new_count = all.iter().filter(|l| l.lead.status == LeadStatus::New).count() as i64;
        let matching: Vec<LeadWithOffer> = all
            .into_iter()
            .filter(|l| query.status.is_none_or(|s| l.lead.status == s))
            .collect();
        let total = matching.len() as i64;
        let data = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();

        Ok(LeadPage {
            data,
            meta: LeadPageMeta {
                total,
                new_count,
                limit: query.limit,
                offset: query.offset,
            },
        })
    }

    async fn recent_leads(&self, business_id: Uuid, limit: i64) -> RepoResult<Vec<LeadWithOffer>> {
        let mut leads = self.tables().business_leads(business_id);
        leads.truncate(limit.max(0) as usize);
        Ok(leads)
    }

    async fn recent_views(&self, business_id: Uuid, limit: i64) -> RepoResult<Vec<OfferView>> {
        let tables = self.tables();
        let mut views: Vec<OfferView> = tables
            .views
            .iter()
            .filter_map(|view| {
                let (offer, owner) = tables.offer_business(view.offer_id)?;
                (owner == business_id).then(|| OfferView {
                    offer_id: view.offer_id,
                    user_name: view.user_name.clone(),
                    offer_title: Some(offer.title.clone()),
                    created_at: view.created_at,
                })
            })
            .collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views.truncate(limit.max(0) as usize);
        Ok(views)
    }

    async fn get_metrics(&self, offer_id: Uuid) -> RepoResult<Option<OfferMetrics>> {
        Ok(self.metrics_for(offer_id))
    }
}

#[async_trait]
impl DeviceTokenRepository for MemoryStore {
    async fn upsert_token(&self, user_id: Uuid, token: &str, platform: &str) -> RepoResult<DeviceToken> {
        let mut tables = self.tables();
        let row = DeviceToken {
            token: token.to_string(),
            user_id,
            platform: platform.to_string(),
            updated_at: Utc::now(),
        };
        match tables.tokens.iter_mut().find(|t| t.token == token) {
            Some(existing) => *existing = row.clone(),
            None => tables.tokens.push(row.clone()),
        }
        Ok(row)
    }

    async fn list_tokens(&self, user_id: Uuid) -> RepoResult<Vec<DeviceToken>> {
        Ok(self.tables().tokens.iter().filter(|t| t.user_id == user_id).cloned().collect())
    }

    async fn delete_tokens(&self, tokens: &[String]) -> RepoResult<u64> {
        let mut tables = self.tables();
        let before = tables.tokens.len();
        tables.tokens.retain(|t| !tokens.contains(&t.token));
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_uncommitted_unit_leaves_no_rows() {
        let store = MemoryStore::new();
        let business = Uuid::new_v4();
        let branch = Branch::default_for(business);

        let mut unit = store.begin().await.unwrap();
        unit.insert_branch(&branch).await.unwrap();
        drop(unit);
        assert_eq!(store.branch_count(business), 0);

        let mut unit = store.begin().await.unwrap();
        unit.insert_branch(&branch).await.unwrap();
        unit.commit().await.unwrap();
        assert_eq!(store.branch_count(business), 1);
    }

    #[tokio::test]
    async fn test_fault_fires_on_nth_call_only() {
        let store = MemoryStore::new();
        store.fail_at(FailPoint::InsertBranch, 2);
        let business = Uuid::new_v4();

        let mut unit = store.begin().await.unwrap();
        assert!(unit.insert_branch(&Branch::default_for(business)).await.is_ok());
        assert!(unit.insert_branch(&Branch::default_for(business)).await.is_err());
        assert!(unit.insert_branch(&Branch::default_for(business)).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_upsert_moves_token_between_users() {
        let store = MemoryStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        store.upsert_token(alice, "device-1", "android").await.unwrap();
        store.upsert_token(bob, "device-1", "ios").await.unwrap();

        assert!(store.tokens_for(alice).is_empty());
        assert_eq!(store.tokens_for(bob), vec!["device-1".to_string()]);
        assert_eq!(store.delete_tokens(&["device-1".to_string()]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_lead_respects_since() {
        let store = MemoryStore::new();
        let offer_id = Uuid::new_v4();
        let now = Utc::now();
        let lead = OfferLead {
            id: Uuid::new_v4(),
            offer_id,
            user_id: None,
            user_phone: "+911111111111".to_string(),
            user_name: None,
            status: LeadStatus::New,
            created_at: now - Duration::hours(2),
            contacted_at: None,
        };
        store.record_lead(&lead).await.unwrap();

        let hit = store.find_recent_lead(offer_id, "+911111111111", now - Duration::hours(3)).await.unwrap();
        let miss = store.find_recent_lead(offer_id, "+911111111111", now - Duration::hours(1)).await.unwrap();
        assert_eq!(hit.map(|l| l.id), Some(lead.id));
        assert!(miss.is_none());
        assert_eq!(store.metrics_for(offer_id).map(|m| m.clicks), Some(1));
    }

    #[tokio::test]
    async fn test_advance_refuses_equal_or_backward_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let lead = OfferLead {
            id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            user_id: None,
            user_phone: "+912222222222".to_string(),
            user_name: None,
            status: LeadStatus::New,
            created_at: now,
            contacted_at: None,
        };
        store.record_lead(&lead).await.unwrap();

        let converted = store
            .advance_lead_status(lead.id, LeadStatus::Converted, Some(now))
            .await
            .unwrap()
            .expect("new -> converted applies");
        assert_eq!(converted.contacted_at, Some(now));

        let later = now + Duration::minutes(5);
        for status in [LeadStatus::New, LeadStatus::Contacted, LeadStatus::Converted] {
            assert!(store.advance_lead_status(lead.id, status, Some(later)).await.unwrap().is_none());
        }
        let stored = store.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeadStatus::Converted);
        assert_eq!(stored.contacted_at, Some(now));
        assert!(store.advance_lead_status(Uuid::new_v4(), LeadStatus::Contacted, None).await.unwrap().is_none());
    }
}
