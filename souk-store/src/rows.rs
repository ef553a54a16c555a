//! Row shapes returned by the Postgres queries and their conversion into
//! domain models. Status and rule-type columns are lowercase TEXT.

use chrono::{DateTime, Utc};
use souk_shared::models::{
    Branch, Business, BusinessSummary, Campaign, Category, DeviceToken, FeedOffer, LeadWithOffer,
    Offer, OfferLead, OfferMedia, OfferMetrics, OfferRule, OfferView, RuleSummary,
};
use souk_shared::ParseEnumError;
use sqlx::FromRow;
use uuid::Uuid;

pub(crate) const OFFER_COLUMNS: &str = "o.id, o.branch_id, o.campaign_id, o.title, o.description, \
    o.status, o.start_date, o.end_date, o.created_by, o.created_at";

pub(crate) const LEAD_COLUMNS: &str =
    "l.id, l.offer_id, l.user_id, l.user_phone, l.user_name, l.status, l.created_at, l.contacted_at";

#[derive(FromRow)]
pub(crate) struct CategoryRow {
    id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    icon: Option<String>,
    is_active: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            icon: row.icon,
            is_active: row.is_active,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct BusinessRow {
    id: Uuid,
    owner_id: Uuid,
    business_name: String,
    logo_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Business {
            id: row.id,
            owner_id: row.owner_id,
            business_name: row.business_name,
            logo_url: row.logo_url,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct BranchRow {
    id: Uuid,
    business_id: Uuid,
    branch_name: String,
    city: Option<String>,
    is_active: bool,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: row.id,
            business_id: row.business_id,
            branch_name: row.branch_name,
            city: row.city,
            is_active: row.is_active,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct CampaignRow {
    id: Uuid,
    business_id: Uuid,
    name: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<CampaignRow> for Campaign {
    fn from(row: CampaignRow) -> Self {
        Campaign {
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct OfferRow {
    id: Uuid,
    branch_id: Uuid,
    campaign_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    status: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = ParseEnumError;

    fn try_from(row: OfferRow) -> Result<Self, Self::Error> {
        Ok(Offer {
            id: row.id,
            branch_id: row.branch_id,
            campaign_id: row.campaign_id,
            title: row.title,
            description: row.description,
            status: row.status.parse()?,
            start_date: row.start_date,
            end_date: row.end_date,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Business and branch columns joined onto an offer.
#[derive(FromRow)]
pub(crate) struct BusinessSummaryRow {
    business_id: Uuid,
    business_name: String,
    logo_url: Option<String>,
    city: Option<String>,
}

impl From<BusinessSummaryRow> for BusinessSummary {
    fn from(row: BusinessSummaryRow) -> Self {
        BusinessSummary {
            business_id: row.business_id,
            business_name: row.business_name,
            logo_url: row.logo_url,
            city: row.city,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct FeedRow {
    #[sqlx(flatten)]
    offer: OfferRow,
    #[sqlx(flatten)]
    business: BusinessSummaryRow,
    thumb_id: Option<Uuid>,
    thumb_url: Option<String>,
    thumb_sort: Option<i32>,
    rule_type: Option<String>,
    discount_value: Option<f64>,
}

impl TryFrom<FeedRow> for FeedOffer {
    type Error = ParseEnumError;

    fn try_from(row: FeedRow) -> Result<Self, Self::Error> {
        let offer = Offer::try_from(row.offer)?;
        let thumbnail = match (row.thumb_id, row.thumb_url) {
            (Some(id), Some(image_url)) => Some(OfferMedia {
                id,
                offer_id: offer.id,
                image_url,
                sort_order: row.thumb_sort.unwrap_or(0),
            }),
            _ => None,
        };
        let rule = row
            .rule_type
            .map(|rule_type| -> Result<RuleSummary, ParseEnumError> {
                Ok(RuleSummary {
                    rule_type: rule_type.parse()?,
                    discount_value: row.discount_value,
                })
            })
            .transpose()?;

        Ok(FeedOffer {
            offer,
            business: row.business.into(),
            thumbnail,
            rule,
        })
    }
}

/// Offer joined with its business, as read for the detail view.
#[derive(FromRow)]
pub(crate) struct OfferWithBusinessRow {
    #[sqlx(flatten)]
    pub offer: OfferRow,
    #[sqlx(flatten)]
    pub business: BusinessSummaryRow,
}

#[derive(FromRow)]
pub(crate) struct RuleRow {
    id: Uuid,
    offer_id: Uuid,
    rule_type: String,
    discount_value: Option<f64>,
    buy_quantity: Option<i32>,
    get_quantity: Option<i32>,
    min_purchase_amount: Option<f64>,
    max_discount_amount: Option<f64>,
    conditions: serde_json::Value,
}

impl TryFrom<RuleRow> for OfferRule {
    type Error = ParseEnumError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        Ok(OfferRule {
            id: row.id,
            offer_id: row.offer_id,
            rule_type: row.rule_type.parse()?,
            discount_value: row.discount_value,
            buy_quantity: row.buy_quantity,
            get_quantity: row.get_quantity,
            min_purchase_amount: row.min_purchase_amount,
            max_discount_amount: row.max_discount_amount,
            conditions: row.conditions,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct MediaRow {
    id: Uuid,
    offer_id: Uuid,
    image_url: String,
    sort_order: i32,
}

impl From<MediaRow> for OfferMedia {
    fn from(row: MediaRow) -> Self {
        OfferMedia {
            id: row.id,
            offer_id: row.offer_id,
            image_url: row.image_url,
            sort_order: row.sort_order,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct MetricsRow {
    offer_id: Uuid,
    views: i64,
    clicks: i64,
    claims: i64,
    saves: i64,
    shares: i64,
    last_updated: DateTime<Utc>,
}

impl From<MetricsRow> for OfferMetrics {
    fn from(row: MetricsRow) -> Self {
        OfferMetrics {
            offer_id: row.offer_id,
            views: row.views,
            clicks: row.clicks,
            claims: row.claims,
            saves: row.saves,
            shares: row.shares,
            last_updated: row.last_updated,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct LeadRow {
    id: Uuid,
    offer_id: Uuid,
    user_id: Option<Uuid>,
    user_phone: String,
    user_name: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    contacted_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeadRow> for OfferLead {
    type Error = ParseEnumError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(OfferLead {
            id: row.id,
            offer_id: row.offer_id,
            user_id: row.user_id,
            user_phone: row.user_phone,
            user_name: row.user_name,
            status: row.status.parse()?,
            created_at: row.created_at,
            contacted_at: row.contacted_at,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct LeadWithOfferRow {
    #[sqlx(flatten)]
    lead: LeadRow,
    offer_title: String,
}

impl TryFrom<LeadWithOfferRow> for LeadWithOffer {
    type Error = ParseEnumError;

    fn try_from(row: LeadWithOfferRow) -> Result<Self, Self::Error> {
        Ok(LeadWithOffer {
            lead: row.lead.try_into()?,
            offer_title: row.offer_title,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct ViewRow {
    offer_id: Uuid,
    user_name: Option<String>,
    offer_title: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ViewRow> for OfferView {
    fn from(row: ViewRow) -> Self {
        OfferView {
            offer_id: row.offer_id,
            user_name: row.user_name,
            offer_title: row.offer_title,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct DeviceTokenRow {
    token: String,
    user_id: Uuid,
    platform: String,
    updated_at: DateTime<Utc>,
}

impl From<DeviceTokenRow> for DeviceToken {
    fn from(row: DeviceTokenRow) -> Self {
        DeviceToken {
            token: row.token,
            user_id: row.user_id,
            platform: row.platform,
            updated_at: row.updated_at,
        }
    }
}
