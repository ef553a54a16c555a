use uuid::Uuid;

/// Emitted once a campaign has committed; drives the follower push fan-out.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CampaignPublishedEvent {
    pub campaign_id: Uuid,
    pub business_id: Uuid,
    pub business_name: String,
    pub campaign_name: String,
    pub offer_count: usize,
    pub timestamp: i64,
}

impl CampaignPublishedEvent {
    pub fn push_title(&self) -> String {
        format!("New offers from {}", self.business_name)
    }

    pub fn push_body(&self) -> String {
        match self.offer_count {
            1 => format!("{} is live with 1 new offer", self.campaign_name),
            n => format!("{} is live with {} new offers", self.campaign_name, n),
        }
    }

    /// Data payload delivered with the push; values are strings as push gateways expect.
    pub fn push_data(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "campaign",
            "campaign_id": self.campaign_id.to_string(),
            "business_id": self.business_id.to_string(),
        })
    }
}

