use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Lead status; only ever moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
}

impl LeadStatus {
    /// Whether reaching this status means the business has been in touch.
    pub fn marks_contact(&self) -> bool {
        matches!(self, LeadStatus::Contacted | LeadStatus::Converted)
    }

    /// Position in the lifecycle; agrees with `Ord`.
    pub fn rank(&self) -> i16 {
        match self {
            LeadStatus::New => 0,
            LeadStatus::Contacted => 1,
            LeadStatus::Converted => 2,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::Contacted => write!(f, "contacted"),
            LeadStatus::Converted => write!(f, "converted"),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "converted" => Ok(LeadStatus::Converted),
            other => Err(ParseEnumError {
                kind: "lead status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferLead {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_phone: String,
    pub user_name: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub contacted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateLeadRequest {
    pub offer_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_phone: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeadWithOffer {
    #[serde(flatten)]
    pub lead: OfferLead,
    pub offer_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeadPageMeta {
    pub total: i64,
    pub new_count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeadPage {
    pub data: Vec<LeadWithOffer>,
    pub meta: LeadPageMeta,
}

/// Row of the `offer_views` table joined with viewer and offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferView {
    pub offer_id: Uuid,
    pub user_name: Option<String>,
    pub offer_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    WhatsappClick,
    View,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub user_name: String,
    pub offer_title: String,
    pub timestamp: DateTime<Utc>,
}
