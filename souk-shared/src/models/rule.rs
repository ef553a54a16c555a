use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Discount strategies an offer rule can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Flat,
    Percentage,
    BuyXGetY,
    Bogo,
    TieredVolume,
    TieredSpending,
    BundleFixedPrice,
    FreeGift,
    Referral,
    FirstOrder,
    LoyaltyPoints,
    MysteryReward,
}

impl RuleType {
    pub const ALL: [RuleType; 12] = [
        RuleType::Flat,
        RuleType::Percentage,
        RuleType::BuyXGetY,
        RuleType::Bogo,
        RuleType::TieredVolume,
        RuleType::TieredSpending,
        RuleType::BundleFixedPrice,
        RuleType::FreeGift,
        RuleType::Referral,
        RuleType::FirstOrder,
        RuleType::LoyaltyPoints,
        RuleType::MysteryReward,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Flat => "flat",
            RuleType::Percentage => "percentage",
            RuleType::BuyXGetY => "buy_x_get_y",
            RuleType::Bogo => "bogo",
            RuleType::TieredVolume => "tiered_volume",
            RuleType::TieredSpending => "tiered_spending",
            RuleType::BundleFixedPrice => "bundle_fixed_price",
            RuleType::FreeGift => "free_gift",
            RuleType::Referral => "referral",
            RuleType::FirstOrder => "first_order",
            RuleType::LoyaltyPoints => "loyalty_points",
            RuleType::MysteryReward => "mystery_reward",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "rule type",
                value: s.to_string(),
            })
    }
}

/// Row of the `offer_rules` table. Only the fields relevant to `rule_type` are set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferRule {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub rule_type: RuleType,
    pub discount_value: Option<f64>,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub min_purchase_amount: Option<f64>,
    pub max_discount_amount: Option<f64>,
    pub conditions: serde_json::Value,
}

/// Rule parameters as submitted by a business owner, before normalisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleParams {
    #[serde(default)]
    pub discount_value: Option<f64>,
    #[serde(default)]
    pub buy_quantity: Option<i32>,
    #[serde(default)]
    pub get_quantity: Option<i32>,
    #[serde(default)]
    pub min_purchase_amount: Option<f64>,
    #[serde(default)]
    pub max_discount_amount: Option<f64>,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
}
