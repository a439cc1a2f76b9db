use crate::models::{LeadRecord, LEAD_SOURCE};
use crate::webhook_models::ExternalResultItem;
use chrono::Utc;
use uuid::Uuid;

/// Request-level values every lead of one search inherits.
#[derive(Debug, Clone)]
pub struct LeadContext {
    pub user_id: Uuid,
    pub niche: String,
    pub city: String,
    pub country: String,
    /// Shared by every lead of the search so the batch can be grouped or undone.
    pub campaign: String,
}

/// Campaign id of the form `search-{unix_millis}-{9 hex chars}`.
pub fn generate_campaign_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("search-{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

/// Maps one webhook item to a lead row, falling back to the request's city
/// and country when the item omits them.
pub fn to_lead_record(item: &ExternalResultItem, ctx: &LeadContext) -> LeadRecord {
    let city = item.city.clone().unwrap_or_else(|| ctx.city.clone());
    let country = item
        .country_code
        .clone()
        .unwrap_or_else(|| ctx.country.clone());
    let address = format!(
        "{}, {}, {}",
        city,
        item.state.as_deref().unwrap_or(""),
        country
    );

    LeadRecord {
        user_id: ctx.user_id,
        name: item.title.clone().unwrap_or_else(|| "N/A".to_string()),
        niche: ctx.niche.clone(),
        city,
        country,
        // A score of 0 means the place has no rating yet
        rating: item.total_score.filter(|score| *score != 0.0),
        reviews: item
            .reviews_count
            .map(|n| n.clamp(0, i32::MAX as i64) as i32)
            .unwrap_or(0),
        phone: item.phone_unformatted.clone(),
        // Position 0 is the primary address even when blank
        email: item.emails.first().filter(|e| !e.is_empty()).cloned(),
        additional_emails: item.emails.get(1..).and_then(non_empty),
        website: item.website.clone(),
        has_website: item.website.is_some(),
        instagram: non_empty(&item.instagrams),
        facebook: non_empty(&item.facebooks),
        twitter: non_empty(&item.twitters),
        youtube: non_empty(&item.youtubes),
        tiktok: non_empty(&item.tiktoks),
        linkedin: non_empty(&item.linkedins),
        address,
        maps_url: item.url.clone(),
        image_url: item.image_url.clone(),
        last_review_date: item.last_review_date.clone(),
        campaign: ctx.campaign.clone(),
        source: LEAD_SOURCE.to_string(),
    }
}

pub fn build_lead_records(items: &[ExternalResultItem], ctx: &LeadContext) -> Vec<LeadRecord> {
    items.iter().map(|item| to_lead_record(item, ctx)).collect()
}
