//! Search relay orchestration.
//!
//! One run goes AUTHENTICATE -> VALIDATE -> NORMALIZE -> DELIVER -> LOG ->
//! INGEST (on success). Authentication and validation fail fast; everything
//! after delivery is best effort and never turns a delivered search into a
//! caller-visible failure.

use crate::auth_client::{bearer_token, Authenticator, CallerIdentity};
use crate::db_storage::RelayStore;
use crate::errors::AppError;
use crate::ingestion::{build_lead_records, generate_campaign_id, LeadContext};
use crate::messages::Locale;
use crate::models::{DeliveryAttemptLog, DeliveryStatus, RelayResponse, SearchRequest, WebhookPayload};
use crate::tokens::build_webhook_payload;
use crate::webhook_client::{DeliveryOutcome, WebhookDelivery};
use crate::webhook_models::parse_result_items;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Weak};

/// Upper bound on searches tracked at once. Entries leave when their run ends.
const IN_FLIGHT_CAPACITY: u64 = 10_000;

type InFlightCache = Cache<String, Weak<i64>>;

/// Search fingerprints mapped to the liveness token of the run holding them.
/// There is no time-based expiry: a run against a slow webhook may legitimately
/// last hours, and a dead token is simply overwritten by the next run.
fn in_flight_cache() -> InFlightCache {
    Cache::builder().max_capacity(IN_FLIGHT_CAPACITY).build()
}

/// Marks one search as running. The marker stays live exactly as long as the
/// guard does, so a run that panics or is dropped never leaves it behind.
struct InFlightGuard {
    cache: InFlightCache,
    key: String,
    /// Run start time, unix seconds.
    token: Arc<i64>,
}

impl InFlightGuard {
    /// Claims `key`, or returns the start time of the run already holding it.
    async fn acquire(cache: &InFlightCache, key: String, started_at: i64) -> Result<Self, i64> {
        let token = Arc::new(started_at);
        let marker = Arc::downgrade(&token);

        let result = cache
            .entry(key.clone())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if entry.value().strong_count() > 0 => Op::Nop,
                    _ => Op::Put(marker),
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(_) | CompResult::ReplacedWith(_) => Ok(Self {
                cache: cache.clone(),
                key,
                token,
            }),
            CompResult::Unchanged(entry) => Err(entry
                .value()
                .upgrade()
                .map(|since| *since)
                .unwrap_or_default()),
            _ => Err(0),
        }
    }

    /// Removes the marker if it is still this run's.
    async fn release(self) {
        let marker = Arc::downgrade(&self.token);
        let _ = self
            .cache
            .entry(self.key.clone())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if Weak::ptr_eq(entry.value(), &marker) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }
}

/// Checks that niche, country and city are present and non-blank.
pub fn validate_search(request: &SearchRequest) -> Result<(), AppError> {
    let missing: Vec<&str> = [
        ("country", &request.country),
        ("city", &request.city),
        ("niche", &request.niche),
    ]
    .iter()
    .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or("").is_empty())
    .map(|(name, _)| *name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Accepts absolute http(s) URLs only.
fn parse_webhook_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed.to_string()),
        _ => None,
    }
}

fn search_fingerprint(user_id: &uuid::Uuid, url: &str, payload: &WebhookPayload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(url.as_bytes());
    hasher.update(serde_json::to_vec(payload).unwrap_or_default());
    hex::encode(hasher.finalize())
}

/// What one completed run produced.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub delivery: DeliveryOutcome,
    pub webhook_url: String,
    pub saved_count: u64,
    /// Set only when delivery succeeded.
    pub campaign: Option<String>,
}

impl RelayOutcome {
    /// Caller-facing status and body.
    pub fn to_response(&self, locale: Locale) -> (StatusCode, RelayResponse) {
        if self.delivery.success {
            return (
                StatusCode::OK,
                RelayResponse {
                    success: true,
                    message: Some(locale.saved_leads(self.saved_count)),
                    saved_count: Some(self.saved_count),
                    attempts: Some(self.delivery.attempts),
                    ..Default::default()
                },
            );
        }

        let error = if self.delivery.ended_with_client_error() {
            locale.input_needs_correction()
        } else {
            locale.temporary_delivery_problem()
        };
        let status = self
            .delivery
            .status_code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .filter(|code| code.is_client_error() || code.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            RelayResponse {
                success: false,
                error: Some(error.to_string()),
                details: self.delivery.response_body.clone(),
                attempts: Some(self.delivery.attempts),
                ..Default::default()
            },
        )
    }
}

/// Relays searches to the automation webhook and ingests the results.
#[derive(Clone)]
pub struct RelayService {
    authenticator: Arc<dyn Authenticator>,
    delivery: Arc<dyn WebhookDelivery>,
    store: Arc<dyn RelayStore>,
    default_webhook_url: String,
    /// Fingerprints of searches currently running.
    in_flight: InFlightCache,
}

impl RelayService {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        delivery: Arc<dyn WebhookDelivery>,
        store: Arc<dyn RelayStore>,
        default_webhook_url: String,
    ) -> Self {
        Self {
            authenticator,
            delivery,
            store,
            default_webhook_url,
            in_flight: in_flight_cache(),
        }
    }

    /// Resolves the bearer credential in `headers` to a caller identity.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
        let token = bearer_token(headers)?;
        self.authenticator.resolve(token).await
    }

    /// Target precedence: request override, then the user's saved URL, then
    /// the configured default.
    pub async fn resolve_webhook_url(
        &self,
        identity: &CallerIdentity,
        requested: Option<&str>,
    ) -> Result<String, AppError> {
        if let Some(raw) = requested.filter(|s| !s.trim().is_empty()) {
            return parse_webhook_url(raw).ok_or_else(|| {
                AppError::BadRequest(format!("webhookUrl must be an http(s) URL: {}", raw))
            });
        }

        match self.store.user_webhook_url(identity.user_id).await {
            Ok(Some(saved)) if !saved.trim().is_empty() => match parse_webhook_url(&saved) {
                Some(url) => return Ok(url),
                None => tracing::warn!(
                    "Ignoring invalid saved webhook URL for user_id={}",
                    identity.user_id
                ),
            },
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to read user settings, using default webhook: {}", e),
        }

        Ok(self.default_webhook_url.clone())
    }

    /// Runs one validated search end to end.
    pub async fn run(
        &self,
        identity: &CallerIdentity,
        request: &SearchRequest,
        locale: Locale,
    ) -> Result<RelayOutcome, AppError> {
        validate_search(request)?;

        let payload = build_webhook_payload(request);
        let webhook_url = self
            .resolve_webhook_url(identity, request.webhook_url.as_deref())
            .await?;

        let fingerprint = search_fingerprint(&identity.user_id, &webhook_url, &payload);
        let guard =
            match InFlightGuard::acquire(&self.in_flight, fingerprint, Utc::now().timestamp())
                .await
            {
                Ok(guard) => guard,
                Err(running_since) => {
                    tracing::warn!(
                        "Duplicate search blocked for user_id={} (running since {})",
                        identity.user_id,
                        running_since
                    );
                    return Err(AppError::Conflict(locale.search_in_progress().to_string()));
                }
            };

        tracing::info!(
            "Relaying search for user_id={} to {}",
            identity.user_id,
            webhook_url
        );
        tracing::debug!(
            "Webhook payload: {}",
            serde_json::to_string(&payload).unwrap_or_default()
        );

        let delivery = self.delivery.deliver(&webhook_url, &payload).await;
        self.record_delivery(identity, &payload, &webhook_url, &delivery)
            .await;

        let (saved_count, campaign) = if delivery.success {
            let campaign = generate_campaign_id();
            let ctx = LeadContext {
                user_id: identity.user_id,
                niche: payload.region.clone(),
                city: payload.city.clone(),
                country: payload.country.clone(),
                campaign: campaign.clone(),
            };
            let saved = self
                .ingest(delivery.response_body.as_deref().unwrap_or(""), &ctx)
                .await;
            (saved, Some(campaign))
        } else {
            (0, None)
        };

        guard.release().await;

        Ok(RelayOutcome {
            delivery,
            webhook_url,
            saved_count,
            campaign,
        })
    }

    /// Writes the run's single audit row. Failures are logged, not returned.
    async fn record_delivery(
        &self,
        identity: &CallerIdentity,
        payload: &WebhookPayload,
        webhook_url: &str,
        delivery: &DeliveryOutcome,
    ) {
        let log = DeliveryAttemptLog {
            user_id: identity.user_id,
            payload: payload.clone(),
            webhook_url: webhook_url.to_string(),
            status: DeliveryStatus::from_outcome(delivery.success, delivery.attempts),
            attempts: delivery.attempts as i32,
            last_attempt_at: Utc::now(),
            response_code: delivery.status_code.map(i32::from),
            response_body: delivery.response_body.clone(),
        };

        if let Err(e) = self.store.insert_delivery_log(&log).await {
            tracing::error!("Failed to log webhook attempt: {}", e);
        }
    }

    /// Parses the success body and stores the leads. Returns the saved count,
    /// 0 on any failure.
    async fn ingest(&self, body: &str, ctx: &LeadContext) -> u64 {
        let items = parse_result_items(body);
        let leads = build_lead_records(&items, ctx);
        if leads.is_empty() {
            tracing::info!("Webhook returned no results to save");
            return 0;
        }

        match self.store.insert_leads(&leads).await {
            Ok(saved) => {
                tracing::info!("Saved {} leads with campaign ID: {}", saved, ctx.campaign);
                saved
            }
            Err(e) => {
                tracing::error!("Failed to save {} leads: {}", leads.len(), e);
                0
            }
        }
    }
}
