/// Webhook delivery tests against a mocked automation endpoint
/// Covers the retry loop: attempt counting, exhaustion and what gets reported back
use std::time::{Duration, Instant};

use lead_relay::models::WebhookPayload;
use lead_relay::webhook_client::{
    RetrySchedule, WebhookClient, WebhookDelivery, MAX_RETRIES_EXCEEDED,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_payload() -> WebhookPayload {
    WebhookPayload {
        country: "Egypt".to_string(),
        region: "Dentists".to_string(),
        city: "Cairo".to_string(),
        minimum_rating: "four".to_string(),
        website_status: "withWebsite".to_string(),
        min_reviews: Some(10),
        include_social_media: Some(true),
        max_results: Some(20),
    }
}

/// Client with near-zero backoff so retries don't slow the suite down
fn fast_client(max_attempts: u32) -> WebhookClient {
    WebhookClient::new(
        Duration::from_secs(5),
        RetrySchedule::new(vec![Duration::from_millis(1)], max_attempts),
    )
    .unwrap()
}

#[tokio::test]
async fn test_first_attempt_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/map-pro"))
        .and(header("content-type", "application/json"))
        .and(body_json(sample_payload()))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(5);
    let url = format!("{}/webhook/map-pro", mock_server.uri());
    let outcome = client.deliver(&url, &sample_payload()).await;

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.status_code, Some(200));
    assert_eq!(outcome.response_body.as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_succeeds_after_transient_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("waking up"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"title":"Acme"}]"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(10);
    let outcome = client.deliver(&mock_server.uri(), &sample_payload()).await;

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.response_body.as_deref(), Some(r#"[{"title":"Acme"}]"#));
}

#[tokio::test]
async fn test_exhaustion_reports_last_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = fast_client(4);
    let outcome = client.deliver(&mock_server.uri(), &sample_payload()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 4);
    assert_eq!(outcome.status_code, Some(500));
    assert_eq!(outcome.response_body.as_deref(), Some("upstream down"));
    assert!(!outcome.ended_with_client_error());
}

#[tokio::test]
async fn test_exhaustion_with_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let client = fast_client(2);
    let outcome = client.deliver(&mock_server.uri(), &sample_payload()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.response_body.as_deref(), Some(MAX_RETRIES_EXCEEDED));
}

#[tokio::test]
async fn test_client_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("workflow not active"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = fast_client(3);
    let outcome = client.deliver(&mock_server.uri(), &sample_payload()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.status_code, Some(404));
    assert!(outcome.ended_with_client_error());
}

#[tokio::test]
async fn test_network_error_on_last_attempt() {
    // Nothing listens on port 1
    let client = fast_client(2);
    let outcome = client
        .deliver("http://127.0.0.1:1/webhook", &sample_payload())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.status_code, None);
    let body = outcome.response_body.unwrap_or_default();
    assert!(!body.is_empty());
    assert_ne!(body, MAX_RETRIES_EXCEEDED);
}

#[tokio::test]
async fn test_no_wait_before_first_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let client = WebhookClient::new(
        Duration::from_secs(5),
        RetrySchedule::new(vec![Duration::from_secs(10)], 3),
    )
    .unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        client.deliver(&mock_server.uri(), &sample_payload()),
    )
    .await
    .expect("first attempt should not be delayed");

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_optional_fields_are_omitted_from_wire() {
    let mock_server = MockServer::start().await;

    let payload = WebhookPayload {
        min_reviews: None,
        include_social_media: None,
        max_results: None,
        minimum_rating: String::new(),
        website_status: "allPlaces".to_string(),
        ..sample_payload()
    };

    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({
            "country": "Egypt",
            "region": "Dentists",
            "city": "Cairo",
            "minimumRating": "",
            "websiteStatus": "allPlaces"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(1);
    let outcome = client.deliver(&mock_server.uri(), &payload).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_waits_follow_schedule_between_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("still failing"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = WebhookClient::new(
        Duration::from_secs(5),
        RetrySchedule::new(vec![Duration::from_millis(200), Duration::from_millis(50)], 4),
    )
    .unwrap();

    let started = Instant::now();
    let outcome = client.deliver(&mock_server.uri(), &sample_payload()).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.attempts, 4);
    // 200ms, then the last delay repeats: 50ms, 50ms
    assert!(
        elapsed >= Duration::from_millis(300),
        "retries were not spaced out: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_no_wait_after_final_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = WebhookClient::new(
        Duration::from_secs(5),
        RetrySchedule::new(vec![Duration::from_millis(100), Duration::from_secs(5)], 2),
    )
    .unwrap();

    let started = Instant::now();
    let outcome = client.deliver(&mock_server.uri(), &sample_payload()).await;
    let elapsed = started.elapsed();

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(
        elapsed < Duration::from_secs(3),
        "slept after the last attempt: {:?}",
        elapsed
    );
}
