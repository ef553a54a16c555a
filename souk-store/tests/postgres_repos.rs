//! Postgres-backed repository tests. They need a reachable `DATABASE_URL`:
//! `cargo test -p souk-store -- --ignored`.

use chrono::{Duration, Utc};
use souk_core::repository::{
    CampaignRepository, FeedQuery, LeadRepository, OfferRepository, WriteUnit,
};
use souk_shared::models::{
    Branch, Business, Campaign, LeadStatus, Offer, OfferLead, OfferMetrics, OfferRule,
    OfferStatus, RuleType,
};
use souk_store::campaign_repo::PostgresCampaignRepository;
use souk_store::lead_repo::PostgresLeadRepository;
use souk_store::offer_repo::PostgresOfferRepository;
use sqlx::PgPool;
use uuid::Uuid;

async fn seed_business(pool: &PgPool) -> (Business, Branch) {
    let business = Business {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        business_name: "Corner Store".to_string(),
        logo_url: None,
        created_at: Utc::now(),
    };
    sqlx::query("INSERT INTO businesses (id, owner_id, business_name, created_at) VALUES ($1, $2, $3, $4)")
        .bind(business.id)
        .bind(business.owner_id)
        .bind(&business.business_name)
        .bind(business.created_at)
        .execute(pool)
        .await
        .unwrap();

    let branch = Branch::default_for(business.id);
    let repo = PostgresCampaignRepository { pool: pool.clone() };
    let mut unit = repo.begin().await.unwrap();
    unit.insert_branch(&branch).await.unwrap();
    unit.commit().await.unwrap();

    (business, branch)
}

fn offer(branch: &Branch, owner: Uuid, created_at: chrono::DateTime<Utc>) -> Offer {
    Offer {
        id: Uuid::new_v4(),
        branch_id: branch.id,
        campaign_id: None,
        title: "Weekend deal".to_string(),
        description: None,
        status: OfferStatus::Active,
        start_date: created_at - Duration::days(1),
        end_date: created_at + Duration::days(7),
        created_by: owner,
        created_at,
    }
}

#[sqlx::test(migrations = "../migrations")]
#[ignore]
async fn test_feed_keyset_pages_do_not_overlap(pool: PgPool) {
    let (business, branch) = seed_business(&pool).await;
    let campaigns = PostgresCampaignRepository { pool: pool.clone() };
    let base = Utc::now() - Duration::minutes(30);

    let mut unit = campaigns.begin().await.unwrap();
    for i in 0..5 {
        unit.insert_offer(&offer(&branch, business.owner_id, base + Duration::seconds(i)))
            .await
            .unwrap();
    }
    unit.commit().await.unwrap();

    let offers = PostgresOfferRepository { pool: pool.clone() };
    let now = Utc::now();
    let first = offers
        .list_feed(&FeedQuery { now, cursor: None, limit: 3 })
        .await
        .unwrap();
    let second = offers
        .list_feed(&FeedQuery { now, cursor: first.last().map(|o| o.offer.id), limit: 3 })
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 2);
    assert!(first[0].offer.created_at > first[2].offer.created_at);
    assert!(second.iter().all(|s| first.iter().all(|f| f.offer.id != s.offer.id)));

    let unknown = offers
        .list_feed(&FeedQuery { now, cursor: Some(Uuid::new_v4()), limit: 3 })
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[sqlx::test(migrations = "../migrations")]
#[ignore]
async fn test_dropped_write_unit_rolls_back(pool: PgPool) {
    let (business, branch) = seed_business(&pool).await;
    let repo = PostgresCampaignRepository { pool: pool.clone() };
    let now = Utc::now();
    let campaign = Campaign {
        id: Uuid::new_v4(),
        business_id: business.id,
        name: "Flash Sale".to_string(),
        start_date: now,
        end_date: now + Duration::days(1),
        created_by: business.owner_id,
        created_at: now,
    };
    let created = offer(&branch, business.owner_id, now);

    let mut unit = repo.begin().await.unwrap();
    unit.insert_campaign(&campaign).await.unwrap();
    unit.insert_offer(&created).await.unwrap();
    unit.insert_rule(&OfferRule {
        id: Uuid::new_v4(),
        offer_id: created.id,
        rule_type: RuleType::Bogo,
        discount_value: None,
        buy_quantity: Some(1),
        get_quantity: Some(1),
        min_purchase_amount: None,
        max_discount_amount: None,
        conditions: serde_json::json!({}),
    })
    .await
    .unwrap();
    unit.insert_metrics(&OfferMetrics::zeroed(created.id, now)).await.unwrap();
    unit.rollback().await.unwrap();

    assert!(repo.get_campaign(campaign.id).await.unwrap().is_none());
    assert!(repo.list_campaign_offers(campaign.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../migrations")]
#[ignore]
async fn test_record_lead_bumps_clicks(pool: PgPool) {
    let (business, branch) = seed_business(&pool).await;
    let campaigns = PostgresCampaignRepository { pool: pool.clone() };
    let target = offer(&branch, business.owner_id, Utc::now());
    let mut unit = campaigns.begin().await.unwrap();
    unit.insert_offer(&target).await.unwrap();
    unit.commit().await.unwrap();

    let leads = PostgresLeadRepository { pool: pool.clone() };
    for phone in ["+910000000001", "+910000000002"] {
        let lead = OfferLead {
            id: Uuid::new_v4(),
            offer_id: target.id,
            user_id: None,
            user_phone: phone.to_string(),
            user_name: None,
            status: LeadStatus::New,
            created_at: Utc::now(),
            contacted_at: None,
        };
        leads.record_lead(&lead).await.unwrap();
    }

    let metrics = leads.get_metrics(target.id).await.unwrap().unwrap();
    assert_eq!(metrics.clicks, 2);
    let recent = leads
        .find_recent_lead(target.id, "+910000000001", Utc::now() - Duration::hours(24))
        .await
        .unwrap();
    assert!(recent.is_some());
}
