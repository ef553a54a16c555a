use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souk_core::repository::{FeedQuery, OfferRepository, RepoResult};
use souk_shared::models::{FeedOffer, Offer, OfferDetail, OfferMedia, OfferMetrics, OfferRule};
use sqlx::PgPool;
use uuid::Uuid;

use crate::rows::{FeedRow, MediaRow, MetricsRow, OfferWithBusinessRow, RuleRow, OFFER_COLUMNS};

/// Offer joined with business, branch city, first image and rule summary.
fn listing_select() -> String {
    format!(
        "SELECT {OFFER_COLUMNS},
                b.id AS business_id, b.business_name, b.logo_url, br.city,
                m.id AS thumb_id, m.image_url AS thumb_url, m.sort_order AS thumb_sort,
                r.rule_type, r.discount_value
         FROM offers o
         JOIN business_branches br ON br.id = o.branch_id
         JOIN businesses b ON b.id = br.business_id
         LEFT JOIN LATERAL (
             SELECT id, image_url, sort_order FROM offer_media
             WHERE offer_id = o.id
             ORDER BY sort_order ASC, id ASC
             LIMIT 1
         ) m ON TRUE
         LEFT JOIN offer_rules r ON r.offer_id = o.id"
    )
}

fn into_feed(rows: Vec<FeedRow>) -> RepoResult<Vec<FeedOffer>> {
    Ok(rows
        .into_iter()
        .map(FeedOffer::try_from)
        .collect::<Result<Vec<_>, _>>()?)
}

pub struct PostgresOfferRepository {
    pub pool: PgPool,
}

#[async_trait]
impl OfferRepository for PostgresOfferRepository {
    async fn list_feed(&self, query: &FeedQuery) -> RepoResult<Vec<FeedOffer>> {
        // An unknown cursor makes the row comparison NULL, which yields an empty page.
        let sql = format!(
            "{}
             WHERE o.status = 'active'
               AND o.start_date <= $1
               AND o.end_date >= $1
               AND ($2::uuid IS NULL
                    OR (o.created_at, o.id) < (SELECT c.created_at, c.id FROM offers c WHERE c.id = $2))
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $3",
            listing_select()
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(query.now)
            .bind(query.cursor)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;

        into_feed(rows)
    }

    async fn list_hot_deals(&self, now: DateTime<Utc>, limit: i64) -> RepoResult<Vec<FeedOffer>> {
        let sql = format!(
            "{}
             WHERE o.status = 'active' AND o.start_date <= $1 AND o.end_date >= $1
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $2",
            listing_select()
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_feed(rows)
    }

    async fn list_business_offers(&self, business_id: Uuid) -> RepoResult<Vec<FeedOffer>> {
        let sql = format!(
            "{}
             WHERE b.id = $1 AND o.status = 'active'
             ORDER BY o.created_at DESC, o.id DESC",
            listing_select()
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await?;

        into_feed(rows)
    }

    async fn get_offer_detail(&self, id: Uuid) -> RepoResult<Option<OfferDetail>> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS}, b.id AS business_id, b.business_name, b.logo_url, br.city
             FROM offers o
             JOIN business_branches br ON br.id = o.branch_id
             JOIN businesses b ON b.id = br.business_id
             WHERE o.id = $1"
        );
        let Some(row) = sqlx::query_as::<_, OfferWithBusinessRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let rule = sqlx::query_as::<_, RuleRow>(
            "SELECT id, offer_id, rule_type, discount_value, buy_quantity, get_quantity,
                    min_purchase_amount, max_discount_amount, conditions
             FROM offer_rules WHERE offer_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(OfferRule::try_from)
        .transpose()?;

        let media = sqlx::query_as::<_, MediaRow>(
            "SELECT id, offer_id, image_url, sort_order
             FROM offer_media WHERE offer_id = $1
             ORDER BY sort_order ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OfferMedia::from)
        .collect();

        let metrics = sqlx::query_as::<_, MetricsRow>(
            "SELECT offer_id, views, clicks, claims, saves, shares, last_updated
             FROM offer_metrics WHERE offer_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(OfferMetrics::from);

        Ok(Some(OfferDetail {
            offer: Offer::try_from(row.offer)?,
            business: row.business.into(),
            rule,
            media,
            metrics,
        }))
    }
}
