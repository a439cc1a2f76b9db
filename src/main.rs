use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_relay::auth_client::HostedAuthClient;
use lead_relay::config::Config;
use lead_relay::db::Database;
use lead_relay::db_storage::PgRelayStore;
use lead_relay::handlers::{self, AppState};
use lead_relay::relay::RelayService;
use lead_relay::webhook_client::WebhookClient;

/// Main entry point for the application.
///
/// This function initializes:
/// - Logging and tracing.
/// - Configuration loading.
/// - Database connection.
/// - Auth provider and webhook clients.
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let authenticator = HostedAuthClient::from_config(&config)?;
    tracing::info!("Auth client initialized: {}", config.auth_base_url);

    let webhook_client = WebhookClient::from_config(&config)?;
    tracing::info!(
        "Webhook client initialized ({} attempts max, {}s per attempt)",
        webhook_client.schedule().max_attempts(),
        config.webhook_timeout_secs
    );

    let relay = RelayService::new(
        Arc::new(authenticator),
        Arc::new(webhook_client),
        Arc::new(PgRelayStore::new(db.pool.clone())),
        config.default_webhook_url.clone(),
    );

    let app_state = Arc::new(AppState { relay });

    // Searches hold the connection open for minutes; a handful per IP is plenty
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let relay_routes = handlers::relay_routes().layer(ServiceBuilder::new().layer(GovernorLayer {
        config: governor_conf,
    }));

    let app = handlers::router(app_state, relay_routes);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
