//! Mapping from search-form filter values to the automation webhook's
//! fixed token vocabulary.
//!
//! Both mappings are total: every input lands on a token, and unrecognized
//! input falls through to the most permissive filter instead of erroring.

use crate::models::{SearchRequest, WebhookPayload, MAX_RESULTS_CAP};

/// Minimum star rating filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimumRating {
    Unconstrained,
    Two,
    TwoAndHalf,
    Three,
    ThreeAndHalf,
    Four,
    FourAndHalf,
}

impl MinimumRating {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "2" => MinimumRating::Two,
            "2.5" => MinimumRating::TwoAndHalf,
            "3" => MinimumRating::Three,
            "3.5" => MinimumRating::ThreeAndHalf,
            "4" => MinimumRating::Four,
            "4.5" => MinimumRating::FourAndHalf,
            // "", "none" and anything unknown
            _ => MinimumRating::Unconstrained,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            MinimumRating::Unconstrained => "",
            MinimumRating::Two => "two",
            MinimumRating::TwoAndHalf => "twoAndHalf",
            MinimumRating::Three => "three",
            MinimumRating::ThreeAndHalf => "threeAndHalf",
            MinimumRating::Four => "four",
            MinimumRating::FourAndHalf => "fourAndHalf",
        }
    }
}

/// Website presence filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebsiteStatus {
    AllPlaces,
    WithWebsite,
    WithoutWebsite,
}

impl WebsiteStatus {
    /// Blank, `none` and `allPlaces` mean no filter, `with` means with a
    /// website, and every other value selects places *without* one.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" | "none" | "allPlaces" => WebsiteStatus::AllPlaces,
            "with" => WebsiteStatus::WithWebsite,
            _ => WebsiteStatus::WithoutWebsite,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            WebsiteStatus::AllPlaces => "allPlaces",
            WebsiteStatus::WithWebsite => "withWebsite",
            WebsiteStatus::WithoutWebsite => "withoutWebsite",
        }
    }
}

pub fn normalize_minimum_rating(raw: &str) -> &'static str {
    MinimumRating::parse(raw).token()
}

pub fn normalize_website_status(raw: &str) -> &'static str {
    WebsiteStatus::parse(raw).token()
}

/// Builds the webhook payload from a request whose required fields were
/// already checked. Missing required fields become empty strings.
pub fn build_webhook_payload(request: &SearchRequest) -> WebhookPayload {
    let min_rating = request
        .min_rating
        .as_ref()
        .map(|v| v.as_text())
        .unwrap_or_default();

    let min_reviews = request
        .min_reviews
        .as_ref()
        .filter(|v| !v.is_blank())
        .map(|v| v.as_int().unwrap_or(0).max(0));

    let max_results = request
        .max_results
        .as_ref()
        .and_then(|v| v.as_int())
        .filter(|n| *n > 0)
        .map(|n| {
            if n > MAX_RESULTS_CAP {
                tracing::warn!("maxResults {} above cap, clamping to {}", n, MAX_RESULTS_CAP);
            }
            n.min(MAX_RESULTS_CAP)
        });

    WebhookPayload {
        country: request.country.clone().unwrap_or_default(),
        region: request.niche.clone().unwrap_or_default(),
        city: request.city.clone().unwrap_or_default(),
        minimum_rating: normalize_minimum_rating(&min_rating).to_string(),
        website_status: normalize_website_status(request.website_filter.as_deref().unwrap_or(""))
            .to_string(),
        min_reviews,
        include_social_media: request.include_social_media,
        max_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextOrNumber;

    fn request() -> SearchRequest {
        SearchRequest {
            niche: Some("Dentists".into()),
            country: Some("Egypt".into()),
            city: Some("Cairo".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rating_tokens() {
        assert_eq!(normalize_minimum_rating("2"), "two");
        assert_eq!(normalize_minimum_rating("2.5"), "twoAndHalf");
        assert_eq!(normalize_minimum_rating("3"), "three");
        assert_eq!(normalize_minimum_rating("3.5"), "threeAndHalf");
        assert_eq!(normalize_minimum_rating("4"), "four");
        assert_eq!(normalize_minimum_rating("4.5"), "fourAndHalf");
    }

    #[test]
    fn test_rating_fallbacks() {
        assert_eq!(normalize_minimum_rating(""), "");
        assert_eq!(normalize_minimum_rating("none"), "");
        assert_eq!(normalize_minimum_rating("abc"), "");
        assert_eq!(normalize_minimum_rating("5"), "");
    }

    #[test]
    fn test_website_status_asymmetry() {
        assert_eq!(normalize_website_status(""), "allPlaces");
        assert_eq!(normalize_website_status("none"), "allPlaces");
        assert_eq!(normalize_website_status("allPlaces"), "allPlaces");
        assert_eq!(normalize_website_status("with"), "withWebsite");
        assert_eq!(normalize_website_status("without"), "withoutWebsite");
        assert_eq!(normalize_website_status("xyz"), "withoutWebsite");
    }

    #[test]
    fn test_payload_defaults() {
        let payload = build_webhook_payload(&request());

        assert_eq!(payload.region, "Dentists");
        assert_eq!(payload.minimum_rating, "");
        assert_eq!(payload.website_status, "allPlaces");
        assert_eq!(payload.min_reviews, None);
        assert_eq!(payload.include_social_media, None);
        assert_eq!(payload.max_results, None);
    }

    #[test]
    fn test_payload_optional_fields() {
        let mut req = request();
        req.min_rating = Some(TextOrNumber::Text("3.5".into()));
        req.website_filter = Some("without".into());
        req.min_reviews = Some(TextOrNumber::Text("not a number".into()));
        req.include_social_media = Some(false);
        req.max_results = Some(TextOrNumber::Number(120.into()));

        let payload = build_webhook_payload(&req);

        assert_eq!(payload.minimum_rating, "threeAndHalf");
        assert_eq!(payload.website_status, "withoutWebsite");
        assert_eq!(payload.min_reviews, Some(0));
        assert_eq!(payload.include_social_media, Some(false));
        assert_eq!(payload.max_results, Some(MAX_RESULTS_CAP));
    }

    #[test]
    fn test_blank_min_reviews_and_zero_max_results_are_dropped() {
        let mut req = request();
        req.min_reviews = Some(TextOrNumber::Text("   ".into()));
        req.max_results = Some(TextOrNumber::Number(0.into()));

        let payload = build_webhook_payload(&req);

        assert_eq!(payload.min_reviews, None);
        assert_eq!(payload.max_results, None);
    }
}
