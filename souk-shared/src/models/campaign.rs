use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::offer::{Offer, OfferMedia};
use super::rule::{OfferRule, RuleParams, RuleType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub business_name: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub id: Uuid,
    pub business_id: Uuid,
    pub branch_name: String,
    pub city: Option<String>,
    pub is_active: bool,
}

impl Branch {
    pub const DEFAULT_NAME: &'static str = "Main Branch";

    /// Branch created on the fly for businesses that never finished onboarding.
    pub fn default_for(business_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_id,
            branch_name: Self::DEFAULT_NAME.to_string(),
            city: None,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One offer to be created as part of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub rules: RuleParams,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub items: Vec<CampaignItem>,
}

/// A standalone offer on an existing branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOfferRequest {
    pub branch_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(alias = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub rules: RuleParams,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedOffer {
    #[serde(flatten)]
    pub offer: Offer,
    pub rule: OfferRule,
    pub media: Vec<OfferMedia>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignCreated {
    pub campaign: Campaign,
    pub offers: Vec<CreatedOffer>,
    /// Set when the business had no branch and one was created with the campaign.
    pub default_branch: Option<Branch>,
}

/// A committed campaign read back with its offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignWithOffers {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub offers: Vec<Offer>,
}
