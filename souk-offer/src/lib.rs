pub mod campaign;
pub mod feed;
pub mod rules;

pub use campaign::CampaignCoordinator;
pub use feed::{FeedConfig, FeedMeta, FeedPage, FeedPaginator};
pub use rules::{normalize_rule, offer_types, OfferTypeInfo};
