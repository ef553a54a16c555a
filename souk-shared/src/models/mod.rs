pub mod campaign;
pub mod category;
pub mod device;
pub mod events;
pub mod lead;
pub mod offer;
pub mod rule;

pub use campaign::{
    Branch, Business, Campaign, CampaignCreated, CampaignItem, CampaignWithOffers,
    CreateCampaignRequest, CreateOfferRequest, CreatedOffer,
};
pub use category::{Category, CategoryNode};
pub use device::DeviceToken;
pub use lead::{
    CreateLeadRequest, Interaction, InteractionKind, LeadPage, LeadPageMeta, LeadStatus,
    LeadWithOffer, OfferLead, OfferView,
};
pub use offer::{BusinessSummary, FeedOffer, Offer, OfferDetail, OfferMedia, OfferMetrics, OfferStatus, RuleSummary};
pub use rule::{OfferRule, RuleParams, RuleType};

/// Returned when a stored TEXT column holds a value outside a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
