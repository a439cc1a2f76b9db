use crate::config::Config;
use crate::errors::AppError;
use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// The authenticated user behind a relay call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

/// Resolves a caller's bearer token to an identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, AppError>;
}

/// Extracts the bearer token from the `Authorization` header.
///
/// The `Bearer ` prefix is optional; a blank value counts as missing.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized(
            "Missing authorization header".to_string(),
        ));
    }
    Ok(token)
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Client for the hosted auth provider's `GET /auth/v1/user` endpoint.
#[derive(Clone)]
pub struct HostedAuthClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HostedAuthClient {
    /// Creates a new `HostedAuthClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The auth provider's base URL.
    /// * `service_key` - Service credential sent as the `apikey` header.
    pub fn new(base_url: String, service_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create auth client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.auth_base_url.clone(), config.service_role_key.clone())
    }
}

#[async_trait]
impl Authenticator for HostedAuthClient {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, AppError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Auth request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Auth provider returned {}: {}",
                status, error_text
            )));
        }
        if !status.is_success() {
            tracing::debug!("Auth provider rejected token with {}", status);
            return Err(AppError::Unauthorized(
                "Invalid authorization token".to_string(),
            ));
        }

        let user: AuthUser = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse auth response: {}", e))
        })?;

        let user_id = Uuid::parse_str(&user.id).map_err(|_| {
            AppError::Unauthorized(format!("Auth provider returned invalid user id '{}'", user.id))
        })?;

        Ok(CallerIdentity { user_id })
    }
}
