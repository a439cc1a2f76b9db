use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound forwarded as `maxResults`; matches the largest value the search form offers.
pub const MAX_RESULTS_CAP: i64 = 50;

/// Source tag stamped on every lead created by the relay.
pub const LEAD_SOURCE: &str = "webhook-search";

// ============ Inbound ============

/// A value the search form may send either as a JSON number or as raw text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Number(serde_json::Number),
    Text(String),
}

impl TextOrNumber {
    /// Textual form, e.g. `4.5` -> `"4.5"`.
    pub fn as_text(&self) -> String {
        match self {
            TextOrNumber::Number(n) => n.to_string(),
            TextOrNumber::Text(s) => s.clone(),
        }
    }

    /// True for blank text. Numbers are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, TextOrNumber::Text(s) if s.trim().is_empty())
    }

    /// Integer read the way a form field is read: leading digits win,
    /// fractional parts are truncated, anything unreadable is `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TextOrNumber::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            TextOrNumber::Text(s) => parse_leading_int(s),
        }
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    leading.parse::<i64>().ok().map(|n| sign * n)
}

/// Search criteria posted by the UI.
///
/// Required fields are optional here so that a missing field surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub min_rating: Option<TextOrNumber>,
    /// Website filter; the UI field is called `hasWebsite`.
    #[serde(default, rename = "hasWebsite", alias = "websiteFilter")]
    pub website_filter: Option<String>,
    #[serde(default)]
    pub min_reviews: Option<TextOrNumber>,
    #[serde(default)]
    pub include_social_media: Option<bool>,
    #[serde(default)]
    pub max_results: Option<TextOrNumber>,
    /// Per-request override of the outbound webhook target.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

// ============ Outbound ============

/// Wire form of a search as the automation webhook expects it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub country: String,
    /// Niche display name; the webhook calls it `region`.
    pub region: String,
    pub city: String,
    /// Rating token, empty string for "no constraint".
    pub minimum_rating: String,
    pub website_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reviews: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_social_media: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<i64>,
}

// ============ Audit ============

/// Summary status of one relay invocation's delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failed,
    /// Failed quickly (fewer than three attempts); likely worth a manual retry.
    Queued,
}

impl DeliveryStatus {
    /// Attempts at or above this count mark a failed run as `failed` instead of `queued`.
    pub const FAILED_AFTER_ATTEMPTS: u32 = 3;

    pub fn from_outcome(success: bool, attempts: u32) -> Self {
        match (success, attempts) {
            (true, _) => DeliveryStatus::Success,
            (false, n) if n >= Self::FAILED_AFTER_ATTEMPTS => DeliveryStatus::Failed,
            (false, _) => DeliveryStatus::Queued,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Queued => "queued",
        }
    }
}

/// One `webhook_logs` row: the outcome of a whole retry sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttemptLog {
    pub user_id: Uuid,
    pub payload: WebhookPayload,
    pub webhook_url: String,
    pub status: DeliveryStatus,
    pub attempts: i32,
    pub last_attempt_at: DateTime<Utc>,
    pub response_code: Option<i32>,
    pub response_body: Option<String>,
}

// ============ Leads ============

/// One `leads` row produced from a webhook result item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub user_id: Uuid,
    pub name: String,
    pub niche: String,
    pub city: String,
    pub country: String,
    pub rating: Option<f64>,
    pub reviews: i32,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub additional_emails: Option<Vec<String>>,
    pub website: Option<String>,
    pub has_website: bool,
    pub instagram: Option<Vec<String>>,
    pub facebook: Option<Vec<String>>,
    pub twitter: Option<Vec<String>>,
    pub youtube: Option<Vec<String>>,
    pub tiktok: Option<Vec<String>>,
    pub linkedin: Option<Vec<String>>,
    pub address: String,
    pub maps_url: Option<String>,
    pub image_url: Option<String>,
    pub last_review_date: Option<String>,
    pub campaign: String,
    pub source: String,
}

// ============ Caller-facing ============

/// Body returned to the UI for a completed relay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
