use crate::errors::AppError;
use crate::messages::Locale;
use crate::models::{RelayResponse, SearchRequest};
use crate::relay::RelayService;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Search bodies are small; anything bigger is rejected before parsing.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Search relay with its auth, delivery and storage collaborators.
    pub relay: RelayService,
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-relay",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /functions/v1/send-webhook
///
/// Forwards a lead search to the automation webhook, waits for the retry
/// loop to finish, and reports how many leads were saved.
///
/// The body is parsed only after the caller is authenticated. The relay run
/// itself is spawned so that a caller hanging up does not cancel delivery,
/// logging or ingestion midway.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<RelayResponse>), AppError>` - The relay summary or
///   an auth/validation error.
pub async fn send_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<RelayResponse>), AppError> {
    let locale = Locale::from_headers(&headers);

    let identity = state.relay.authenticate(&headers).await?;

    let request: SearchRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    tracing::info!(
        "Search request from user_id={}: niche={:?}, city={:?}, country={:?}",
        identity.user_id,
        request.niche,
        request.city,
        request.country
    );

    let relay = state.relay.clone();
    let run = tokio::spawn(async move { relay.run(&identity, &request, locale).await });

    match run.await {
        Ok(Ok(outcome)) => {
            tracing::info!(
                "Relay finished: success={}, attempts={}, saved={}, url={}",
                outcome.delivery.success,
                outcome.delivery.attempts,
                outcome.saved_count,
                outcome.webhook_url
            );
            let (status, response) = outcome.to_response(locale);
            Ok((status, Json(response)))
        }
        Ok(Err(e)) => Err(e),
        Err(join_error) => {
            tracing::error!("Relay task failed: {}", join_error);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RelayResponse {
                    success: false,
                    error: Some(locale.unexpected_error().to_string()),
                    details: Some(join_error.to_string()),
                    ..Default::default()
                }),
            ))
        }
    }
}

/// Relay endpoints, without state. The binary layers rate limiting on top.
pub fn relay_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/functions/v1/send-webhook", post(send_webhook))
        .route("/api/v1/search", post(send_webhook))
}

/// Full application router: health check plus the given relay routes, with
/// body limit, tracing and permissive CORS for the browser UI.
pub fn router(state: Arc<AppState>, relay: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(relay.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
