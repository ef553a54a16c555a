use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souk_core::repository::{BusinessLeadQuery, LeadRepository, RepoResult};
use souk_shared::models::{
    LeadPage, LeadPageMeta, LeadStatus, LeadWithOffer, OfferLead, OfferMetrics, OfferView,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::rows::{LeadRow, LeadWithOfferRow, MetricsRow, ViewRow, LEAD_COLUMNS};

pub struct PostgresLeadRepository {
    pub pool: PgPool,
}

fn into_leads(rows: Vec<LeadWithOfferRow>) -> RepoResult<Vec<LeadWithOffer>> {
    Ok(rows
        .into_iter()
        .map(LeadWithOffer::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn offer_exists(&self, offer_id: Uuid) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM offers WHERE id = $1)")
            .bind(offer_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_recent_lead(
        &self,
        offer_id: Uuid,
        phone: &str,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<OfferLead>> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM offer_leads l
             WHERE l.offer_id = $1 AND l.user_phone = $2 AND l.created_at >= $3
             ORDER BY l.created_at DESC
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(offer_id)
            .bind(phone)
            .bind(since)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(OfferLead::try_from).transpose()?)
    }

    async fn record_lead(&self, lead: &OfferLead) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO offer_leads
                (id, offer_id, user_id, user_phone, user_name, status, created_at, contacted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(lead.id)
        .bind(lead.offer_id)
        .bind(lead.user_id)
        .bind(&lead.user_phone)
        .bind(&lead.user_name)
        .bind(lead.status.to_string())
        .bind(lead.created_at)
        .bind(lead.contacted_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO offer_metrics (offer_id, clicks, last_updated)
             VALUES ($1, 1, NOW())
             ON CONFLICT (offer_id)
             DO UPDATE SET clicks = offer_metrics.clicks + 1, last_updated = NOW()",
        )
        .bind(lead.offer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_lead(&self, id: Uuid) -> RepoResult<Option<OfferLead>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM offer_leads l WHERE l.id = $1");
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(OfferLead::try_from).transpose()?)
    }

    async fn advance_lead_status(
        &self,
        id: Uuid,
        status: LeadStatus,
        contacted_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Option<OfferLead>> {
        let sql = format!(
            "UPDATE offer_leads l
             SET status = $2, contacted_at = COALESCE(l.contacted_at, $3)
             WHERE l.id = $1
               AND (CASE l.status WHEN 'new' THEN 0 WHEN 'contacted' THEN 1 ELSE 2 END) < $4
             RETURNING {LEAD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .bind(status.to_string())
            .bind(contacted_at)
            .bind(status.rank())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(OfferLead::try_from).transpose()?)
    }

    async fn list_business_leads(&self, query: &BusinessLeadQuery) -> RepoResult<LeadPage> {
        let status = query.status.map(|s| s.to_string());

        let sql = format!(
            "SELECT {LEAD_COLUMNS}, o.title AS offer_title
             FROM offer_leads l
             JOIN offers o ON o.id = l.offer_id
             JOIN business_branches br ON br.id = o.branch_id
             WHERE br.business_id = $1 AND ($2::text IS NULL OR l.status = $2)
             ORDER BY l.created_at DESC, l.id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, LeadWithOfferRow>(&sql)
            .bind(query.business_id)
            .bind(&status)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let (total, new_count) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*) FILTER (WHERE $2::text IS NULL OR l.status = $2),
                    COUNT(*) FILTER (WHERE l.status = 'new')
             FROM offer_leads l
             JOIN offers o ON o.id = l.offer_id
             JOIN business_branches br ON br.id = o.branch_id
             WHERE br.business_id = $1",
        )
        .bind(query.business_id)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        Ok(LeadPage {
            data: into_leads(rows)?,
            meta: LeadPageMeta {
                total,
                new_count,
                limit: query.limit,
                offset: query.offset,
            },
        })
    }

    async fn recent_leads(&self, business_id: Uuid, limit: i64) -> RepoResult<Vec<LeadWithOffer>> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS}, o.title AS offer_title
             FROM offer_leads l
             JOIN offers o ON o.id = l.offer_id
             JOIN business_branches br ON br.id = o.branch_id
             WHERE br.business_id = $1
             ORDER BY l.created_at DESC
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, LeadWithOfferRow>(&sql)
            .bind(business_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_leads(rows)
    }

    async fn recent_views(&self, business_id: Uuid, limit: i64) -> RepoResult<Vec<OfferView>> {
        let rows = sqlx::query_as::<_, ViewRow>(
            "SELECT v.offer_id, u.name AS user_name, o.title AS offer_title, v.created_at
             FROM offer_views v
             JOIN offers o ON o.id = v.offer_id
             JOIN business_branches br ON br.id = o.branch_id
             LEFT JOIN users u ON u.id = v.user_id
             WHERE br.business_id = $1
             ORDER BY v.created_at DESC
             LIMIT $2",
        )
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OfferView::from).collect())
    }

    async fn get_metrics(&self, offer_id: Uuid) -> RepoResult<Option<OfferMetrics>> {
        let row = sqlx::query_as::<_, MetricsRow>(
            "SELECT offer_id, views, clicks, claims, saves, shares, last_updated
             FROM offer_metrics WHERE offer_id = $1",
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OfferMetrics::from))
    }
}
