use serde_json::Value;

/// One business returned by the automation webhook.
///
/// The webhook output is loosely typed (it is whatever the scraping workflow
/// emits), so fields are read one by one and a value of the wrong JSON type
/// counts as absent. Empty strings count as absent too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalResultItem {
    pub title: Option<String>,
    pub total_score: Option<f64>,
    pub reviews_count: Option<i64>,
    pub phone_unformatted: Option<String>,
    pub emails: Vec<String>,
    pub website: Option<String>,
    pub instagrams: Vec<String>,
    pub facebooks: Vec<String>,
    pub twitters: Vec<String>,
    pub youtubes: Vec<String>,
    pub tiktoks: Vec<String>,
    pub linkedins: Vec<String>,
    /// Google Maps link.
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country_code: Option<String>,
    pub last_review_date: Option<String>,
}

impl ExternalResultItem {
    pub fn from_value(item: &Value) -> Self {
        Self {
            title: text(item, "title"),
            total_score: item.get("totalScore").and_then(|v| v.as_f64()),
            reviews_count: item
                .get("reviewsCount")
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))),
            phone_unformatted: text(item, "phoneUnformatted"),
            emails: positional_text_list(item, "emails"),
            website: text(item, "website"),
            instagrams: text_list(item, "instagrams"),
            facebooks: text_list(item, "facebooks"),
            twitters: text_list(item, "twitters"),
            youtubes: text_list(item, "youtubes"),
            tiktoks: text_list(item, "tiktoks"),
            linkedins: text_list(item, "linkedins"),
            url: text(item, "url"),
            image_url: text(item, "imageUrl"),
            city: text(item, "city"),
            state: text(item, "state"),
            country_code: text(item, "countryCode"),
            // Flattened dataset exports use the literal key; raw items nest it.
            last_review_date: text(item, "reviews[0].publishAt").or_else(|| {
                item.get("reviews")
                    .and_then(|r| r.get(0))
                    .and_then(|r| r.get("publishAt"))
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            }),
        }
    }
}

/// Parses a webhook success body. Anything other than a JSON array yields no items.
pub fn parse_result_items(body: &str) -> Vec<ExternalResultItem> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items.iter().map(ExternalResultItem::from_value).collect(),
        Ok(other) => {
            tracing::warn!(
                "Webhook response is not an array (got {}), ingesting nothing",
                json_kind(&other)
            );
            Vec::new()
        }
        Err(e) => {
            tracing::error!("Failed to parse webhook response: {}", e);
            Vec::new()
        }
    }
}

fn text(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_list(item: &Value, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Like [`text_list`] but keeps empty strings, so element positions survive.
fn positional_text_list(item: &Value, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
