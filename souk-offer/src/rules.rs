use serde::Serialize;
use souk_core::{CoreError, CoreResult};
use souk_shared::models::{OfferRule, RuleParams, RuleType};
use uuid::Uuid;

/// Describes a rule type for the offer-creation screens.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OfferTypeInfo {
    pub id: RuleType,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub fn offer_types() -> Vec<OfferTypeInfo> {
    RuleType::ALL.iter().map(|&rule_type| describe(rule_type)).collect()
}

fn describe(rule_type: RuleType) -> OfferTypeInfo {
    let (title, description, icon) = match rule_type {
        RuleType::Flat => ("Flat Amount Off", "Give a fixed amount discount (e.g., 100 off)", "tag"),
        RuleType::Percentage => ("Percentage Off", "Give a percentage discount (e.g., 20% off)", "percent"),
        RuleType::BuyXGetY => ("Buy X Get Y", "Buy specific items to get others for free or discounted", "shopping-bag"),
        RuleType::Bogo => ("Buy 1 Get 1 Free", "Classic BOGO offer", "users"),
        RuleType::TieredVolume => ("Tiered Volume", "Buy more, save more (e.g., buy 2 get 10%, buy 3 get 20%)", "layers"),
        RuleType::TieredSpending => ("Tiered Spending", "Spend more, save more (e.g., spend 500 get 50 off)", "dollar-sign"),
        RuleType::BundleFixedPrice => ("Bundle Price", "Sell a group of items for a fixed total price", "package"),
        RuleType::FreeGift => ("Free Gift", "Free gift with purchase over a certain amount", "gift"),
        RuleType::Referral => ("Referral Bonus", "Reward users for referring friends", "user-plus"),
        RuleType::FirstOrder => ("First Order", "Special discount for first-time customers", "star"),
        RuleType::LoyaltyPoints => ("Loyalty Points", "Earn double or triple points", "award"),
        RuleType::MysteryReward => ("Mystery Reward", "Gamified scratch card reward", "help-circle"),
    };
    OfferTypeInfo {
        id: rule_type,
        title,
        description,
        icon,
    }
}

/// Validates `params` for `rule_type` and builds the rule row, keeping only
/// the fields that strategy uses.
pub fn normalize_rule(offer_id: Uuid, rule_type: RuleType, params: &RuleParams) -> CoreResult<OfferRule> {
    reject_negative("discount_value", params.discount_value)?;
    reject_negative("min_purchase_amount", params.min_purchase_amount)?;
    reject_negative("max_discount_amount", params.max_discount_amount)?;

    let conditions = params
        .conditions
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));

    let mut rule = OfferRule {
        id: Uuid::new_v4(),
        offer_id,
        rule_type,
        discount_value: None,
        buy_quantity: None,
        get_quantity: None,
        min_purchase_amount: None,
        max_discount_amount: None,
        conditions: serde_json::json!({}),
    };

    match rule_type {
        RuleType::Flat => {
            rule.discount_value = Some(require_positive(rule_type, "discount_value", params.discount_value)?);
            rule.min_purchase_amount = params.min_purchase_amount;
        }
        RuleType::Percentage => {
            let pct = require_positive(rule_type, "discount_value", params.discount_value)?;
            if pct > 100.0 {
                return Err(CoreError::ValidationError(format!(
                    "percentage discount must be at most 100, got {pct}"
                )));
            }
            rule.discount_value = Some(pct);
            rule.max_discount_amount = params.max_discount_amount;
            rule.min_purchase_amount = params.min_purchase_amount;
        }
        RuleType::BuyXGetY => {
            rule.buy_quantity = Some(require_quantity(rule_type, "buy_quantity", params.buy_quantity)?);
            rule.get_quantity = Some(require_quantity(rule_type, "get_quantity", params.get_quantity)?);
        }
        RuleType::Bogo => {
            rule.buy_quantity = Some(1);
            rule.get_quantity = Some(1);
        }
        RuleType::TieredVolume | RuleType::TieredSpending => {
            let has_tiers = conditions
                .get("tiers")
                .and_then(|tiers| tiers.as_array())
                .is_some_and(|tiers| !tiers.is_empty());
            if !has_tiers {
                return Err(CoreError::ValidationError(format!(
                    "{rule_type} rule needs a non-empty conditions.tiers list"
                )));
            }
            if rule_type == RuleType::TieredSpending {
                rule.min_purchase_amount = params.min_purchase_amount;
            }
            rule.conditions = conditions;
        }
        RuleType::BundleFixedPrice => {
            rule.discount_value = Some(require_positive(rule_type, "discount_value", params.discount_value)?);
        }
        RuleType::FreeGift => {
            rule.min_purchase_amount = Some(params.min_purchase_amount.ok_or_else(|| missing(rule_type, "min_purchase_amount"))?);
            rule.conditions = conditions;
        }
        RuleType::Referral | RuleType::FirstOrder => {
            rule.discount_value = params.discount_value;
            rule.max_discount_amount = params.max_discount_amount;
        }
        RuleType::LoyaltyPoints => {
            rule.discount_value = params.discount_value;
        }
        RuleType::MysteryReward => {
            rule.conditions = conditions;
        }
    }

    Ok(rule)
}

fn missing(rule_type: RuleType, field: &str) -> CoreError {
    CoreError::ValidationError(format!("{rule_type} rule requires {field}"))
}

fn reject_negative(field: &str, value: Option<f64>) -> CoreResult<()> {
    match value {
        Some(v) if v < 0.0 || !v.is_finite() => Err(CoreError::ValidationError(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn require_positive(rule_type: RuleType, field: &str, value: Option<f64>) -> CoreResult<f64> {
    match value {
        Some(v) if v > 0.0 => Ok(v),
        Some(_) => Err(CoreError::ValidationError(format!("{field} must be greater than zero"))),
        None => Err(missing(rule_type, field)),
    }
}

fn require_quantity(rule_type: RuleType, field: &str, value: Option<i32>) -> CoreResult<i32> {
    match value {
        Some(q) if q >= 1 => Ok(q),
        Some(_) => Err(CoreError::ValidationError(format!("{field} must be at least 1"))),
        None => Err(missing(rule_type, field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> RuleParams {
        RuleParams::default()
    }

    #[test]
    fn test_catalogue_covers_every_type_once() {
        let types = offer_types();
        assert_eq!(types.len(), RuleType::ALL.len());
        assert_eq!(types[0].id, RuleType::Flat);
        assert_eq!(types[3].title, "Buy 1 Get 1 Free");
    }

    #[test]
    fn test_percentage_keeps_only_relevant_fields() {
        let input = RuleParams {
            discount_value: Some(30.0),
            buy_quantity: Some(4),
            max_discount_amount: Some(200.0),
            ..params()
        };
        let rule = normalize_rule(Uuid::new_v4(), RuleType::Percentage, &input).unwrap();
        assert_eq!(rule.discount_value, Some(30.0));
        assert_eq!(rule.max_discount_amount, Some(200.0));
        assert_eq!(rule.buy_quantity, None);
    }

    #[test]
    fn test_percentage_bounds() {
        let over = RuleParams { discount_value: Some(120.0), ..params() };
        assert!(normalize_rule(Uuid::new_v4(), RuleType::Percentage, &over).is_err());
        assert!(normalize_rule(Uuid::new_v4(), RuleType::Percentage, &params()).is_err());
    }

    #[test]
    fn test_bogo_needs_no_parameters() {
        let rule = normalize_rule(Uuid::new_v4(), RuleType::Bogo, &params()).unwrap();
        assert_eq!((rule.buy_quantity, rule.get_quantity), (Some(1), Some(1)));
        assert_eq!(rule.discount_value, None);
    }

    #[test]
    fn test_buy_x_get_y_quantities() {
        let ok = RuleParams { buy_quantity: Some(2), get_quantity: Some(1), ..params() };
        let rule = normalize_rule(Uuid::new_v4(), RuleType::BuyXGetY, &ok).unwrap();
        assert_eq!(rule.buy_quantity, Some(2));

        let zero = RuleParams { buy_quantity: Some(0), get_quantity: Some(1), ..params() };
        assert!(normalize_rule(Uuid::new_v4(), RuleType::BuyXGetY, &zero).is_err());
    }

    #[test]
    fn test_tiered_rules_require_tiers() {
        let tiers = RuleParams {
            conditions: Some(json!({"tiers": [{"min_qty": 2, "percent": 10}]})),
            ..params()
        };
        let rule = normalize_rule(Uuid::new_v4(), RuleType::TieredVolume, &tiers).unwrap();
        assert_eq!(rule.conditions["tiers"][0]["percent"], 10);

        let empty = RuleParams { conditions: Some(json!({"tiers": []})), ..params() };
        assert!(normalize_rule(Uuid::new_v4(), RuleType::TieredSpending, &empty).is_err());
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let negative = RuleParams { min_purchase_amount: Some(-1.0), ..params() };
        assert!(normalize_rule(Uuid::new_v4(), RuleType::FirstOrder, &negative).is_err());
    }
}
