use souk_shared::models::{Interaction, InteractionKind, LeadWithOffer, OfferView};

const ANONYMOUS: &str = "Anonymous";

/// Merges lead clicks and offer views into one newest-first activity list.
pub fn merge_interactions(leads: Vec<LeadWithOffer>, views: Vec<OfferView>, limit: usize) -> Vec<Interaction> {
    let clicks = leads.into_iter().map(|entry| Interaction {
        kind: InteractionKind::WhatsappClick,
        user_name: display_name(entry.lead.user_name),
        offer_title: entry.offer_title,
        timestamp: entry.lead.created_at,
    });
    let seen = views.into_iter().map(|view| Interaction {
        kind: InteractionKind::View,
        user_name: display_name(view.user_name),
        offer_title: view.offer_title.unwrap_or_default(),
        timestamp: view.created_at,
    });

    let mut merged: Vec<Interaction> = clicks.chain(seen).collect();
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(limit);
    merged
}

fn display_name(name: Option<String>) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}
