use serde::Deserialize;

/// Delivery defaults used when the environment leaves them unset.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL of the hosted auth provider (e.g. the Supabase project URL).
    pub auth_base_url: String,
    /// Service credential sent as `apikey` to the auth provider.
    pub service_role_key: String,
    /// Outbound target used when neither the request nor the user settings name one.
    pub default_webhook_url: String,
    pub webhook_max_attempts: u32,
    pub webhook_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .or_else(|_| std::env::var("SUPABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("AUTH_BASE_URL or SUPABASE_URL environment variable required")
                })
                .and_then(|url| require_http_url("AUTH_BASE_URL", url))
                .map(|url| url.trim_end_matches('/').to_string())?,
            service_role_key: std::env::var("SERVICE_ROLE_KEY")
                .or_else(|_| std::env::var("SUPABASE_SERVICE_ROLE_KEY"))
                .map_err(|_| {
                    anyhow::anyhow!(
                        "SERVICE_ROLE_KEY or SUPABASE_SERVICE_ROLE_KEY environment variable required"
                    )
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("SERVICE_ROLE_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            default_webhook_url: std::env::var("DEFAULT_WEBHOOK_URL")
                .map_err(|_| anyhow::anyhow!("DEFAULT_WEBHOOK_URL environment variable required"))
                .and_then(|url| require_http_url("DEFAULT_WEBHOOK_URL", url))?,
            webhook_max_attempts: std::env::var("WEBHOOK_MAX_ATTEMPTS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<u32>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("WEBHOOK_MAX_ATTEMPTS must be a positive integer"))?
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            webhook_timeout_secs: std::env::var("WEBHOOK_TIMEOUT_SECS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<u64>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("WEBHOOK_TIMEOUT_SECS must be a positive integer"))?
                .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS),
        };

        if config.webhook_max_attempts == 0 {
            anyhow::bail!("WEBHOOK_MAX_ATTEMPTS must be at least 1");
        }
        if config.webhook_timeout_secs == 0 {
            anyhow::bail!("WEBHOOK_TIMEOUT_SECS must be at least 1");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Auth Base URL: {}", config.auth_base_url);
        tracing::info!("Default webhook URL: {}", config.default_webhook_url);
        tracing::debug!(
            "Webhook delivery: max_attempts={}, timeout={}s",
            config.webhook_max_attempts,
            config.webhook_timeout_secs
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn require_http_url(name: &str, url: String) -> anyhow::Result<String> {
    let url = url.trim();
    if url.is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.to_string())
}
