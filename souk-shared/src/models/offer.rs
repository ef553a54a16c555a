use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::rule::{OfferRule, RuleType};
use super::ParseEnumError;

/// Offer status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Active,
    Paused,
}

impl OfferStatus {
    pub fn toggled(self) -> Self {
        match self {
            OfferStatus::Active => OfferStatus::Paused,
            OfferStatus::Paused => OfferStatus::Active,
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferStatus::Active => write!(f, "active"),
            OfferStatus::Paused => write!(f, "paused"),
        }
    }
}

impl FromStr for OfferStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OfferStatus::Active),
            "paused" => Ok(OfferStatus::Paused),
            other => Err(ParseEnumError {
                kind: "offer status",
                value: other.to_string(),
            }),
        }
    }
}

/// An offer published by a business branch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: OfferStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Whether the offer belongs in the public feed at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Active && self.start_date <= now && now <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferMedia {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub image_url: String,
    pub sort_order: i32,
}

/// Engagement counters, upserted alongside events rather than derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferMetrics {
    pub offer_id: Uuid,
    pub views: i64,
    pub clicks: i64,
    pub claims: i64,
    pub saves: i64,
    pub shares: i64,
    pub last_updated: DateTime<Utc>,
}

impl OfferMetrics {
    pub fn zeroed(offer_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            offer_id,
            views: 0,
            clicks: 0,
            claims: 0,
            saves: 0,
            shares: 0,
            last_updated: now,
        }
    }
}

/// Business and branch details embedded in listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessSummary {
    pub business_id: Uuid,
    pub business_name: String,
    pub logo_url: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSummary {
    pub rule_type: RuleType,
    pub discount_value: Option<f64>,
}

/// Listing entry: the offer plus what a card in the feed needs to render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedOffer {
    #[serde(flatten)]
    pub offer: Offer,
    pub business: BusinessSummary,
    pub thumbnail: Option<OfferMedia>,
    pub rule: Option<RuleSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferDetail {
    #[serde(flatten)]
    pub offer: Offer,
    pub business: BusinessSummary,
    pub rule: Option<OfferRule>,
    pub media: Vec<OfferMedia>,
    pub metrics: Option<OfferMetrics>,
}
