/// Auth provider client tests against a mocked `/auth/v1/user` endpoint
use lead_relay::auth_client::{Authenticator, HostedAuthClient};
use lead_relay::errors::AppError;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HostedAuthClient {
    HostedAuthClient::new(format!("{}/", server.uri()), "service-key".to_string()).unwrap()
}

#[tokio::test]
async fn test_valid_token_resolves_identity() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer user-jwt"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": user_id.to_string(),
            "email": "agent@example.com",
            "role": "authenticated"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let identity = client_for(&mock_server).resolve("user-jwt").await.unwrap();

    assert_eq!(identity.user_id, user_id);
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "msg": "invalid JWT"
        })))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).resolve("expired").await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_provider_outage_is_external_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).resolve("user-jwt").await;
    match result {
        Err(AppError::ExternalApiError(msg)) => assert!(msg.contains("maintenance")),
        other => panic!("expected ExternalApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_uuid_user_id_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "anonymous"
        })))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).resolve("user-jwt").await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}
