use async_trait::async_trait;
use souk_core::repository::{CampaignRepository, RepoResult, WriteUnit};
use souk_shared::models::{Branch, Business, Campaign, Offer, OfferMedia, OfferMetrics, OfferRule};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::rows::{BranchRow, BusinessRow, CampaignRow, OfferRow, OFFER_COLUMNS};

pub struct PostgresCampaignRepository {
    pub pool: PgPool,
}

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    async fn find_business_for_owner(&self, owner_id: Uuid) -> RepoResult<Option<Business>> {
        let row = sqlx::query_as::<_, BusinessRow>(
            "SELECT id, owner_id, business_name, logo_url, created_at
             FROM businesses
             WHERE owner_id = $1
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Business::from))
    }

    async fn find_branch(&self, branch_id: Uuid) -> RepoResult<Option<Branch>> {
        let row = sqlx::query_as::<_, BranchRow>(
            "SELECT id, business_id, branch_name, city, is_active
             FROM business_branches WHERE id = $1",
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Branch::from))
    }

    async fn list_branches(&self, business_id: Uuid) -> RepoResult<Vec<Branch>> {
        let rows = sqlx::query_as::<_, BranchRow>(
            "SELECT id, business_id, branch_name, city, is_active
             FROM business_branches
             WHERE business_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Branch::from).collect())
    }

    async fn list_follower_ids(&self, business_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM user_followed_businesses WHERE business_id = $1",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn get_campaign(&self, id: Uuid) -> RepoResult<Option<Campaign>> {
        let row = sqlx::query_as::<_, CampaignRow>(
            "SELECT id, business_id, name, start_date, end_date, created_by, created_at
             FROM campaigns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Campaign::from))
    }

    async fn list_campaign_offers(&self, campaign_id: Uuid) -> RepoResult<Vec<Offer>> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM offers o
             WHERE o.campaign_id = $1
             ORDER BY o.created_at ASC, o.id ASC"
        );
        let rows = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(Offer::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn toggle_offer_status(&self, offer_id: Uuid) -> RepoResult<Option<Offer>> {
        let sql = format!(
            "UPDATE offers AS o
             SET status = CASE o.status WHEN 'active' THEN 'paused' ELSE 'active' END
             WHERE o.id = $1
             RETURNING {OFFER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Offer::try_from).transpose()?)
    }

    async fn begin(&self) -> RepoResult<Box<dyn WriteUnit>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgWriteUnit { tx }))
    }
}

/// Write unit backed by one Postgres transaction. Dropping it uncommitted
/// rolls the transaction back.
pub struct PgWriteUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WriteUnit for PgWriteUnit {
    async fn insert_branch(&mut self, branch: &Branch) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO business_branches (id, business_id, branch_name, city, is_active)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(branch.id)
        .bind(branch.business_id)
        .bind(&branch.branch_name)
        .bind(&branch.city)
        .bind(branch.is_active)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_campaign(&mut self, campaign: &Campaign) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO campaigns (id, business_id, name, start_date, end_date, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(campaign.id)
        .bind(campaign.business_id)
        .bind(&campaign.name)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.created_by)
        .bind(campaign.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_offer(&mut self, offer: &Offer) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO offers
                (id, branch_id, campaign_id, title, description, status, start_date, end_date, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(offer.id)
        .bind(offer.branch_id)
        .bind(offer.campaign_id)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.status.to_string())
        .bind(offer.start_date)
        .bind(offer.end_date)
        .bind(offer.created_by)
        .bind(offer.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_rule(&mut self, rule: &OfferRule) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO offer_rules
                (id, offer_id, rule_type, discount_value, buy_quantity, get_quantity,
                 min_purchase_amount, max_discount_amount, conditions)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(rule.id)
        .bind(rule.offer_id)
        .bind(rule.rule_type.as_str())
        .bind(rule.discount_value)
        .bind(rule.buy_quantity)
        .bind(rule.get_quantity)
        .bind(rule.min_purchase_amount)
        .bind(rule.max_discount_amount)
        .bind(&rule.conditions)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_media(&mut self, media: &OfferMedia) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO offer_media (id, offer_id, image_url, sort_order)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(media.id)
        .bind(media.offer_id)
        .bind(&media.image_url)
        .bind(media.sort_order)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_metrics(&mut self, metrics: &OfferMetrics) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO offer_metrics (offer_id, views, clicks, claims, saves, shares, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (offer_id) DO NOTHING",
        )
        .bind(metrics.offer_id)
        .bind(metrics.views)
        .bind(metrics.clicks)
        .bind(metrics.claims)
        .bind(metrics.saves)
        .bind(metrics.shares)
        .bind(metrics.last_updated)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await?;
        debug!("Write unit committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
