pub mod interactions;
pub mod manager;

pub use interactions::merge_interactions;
pub use manager::{LeadConfig, LeadError, LeadService};
