use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use souk_api::{
    app,
    state::{AppState, AuthConfig, RateLimit, Repositories},
};
use souk_lead::LeadConfig;
use souk_offer::FeedConfig;
use souk_store::{
    app_config::Config,
    campaign_repo::PostgresCampaignRepository,
    category_repo::PostgresCategoryRepository,
    device_repo::PostgresDeviceTokenRepository,
    lead_repo::PostgresLeadRepository,
    offer_repo::PostgresOfferRepository,
    DbClient, PushGateway, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "souk_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Souk API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let devices = Arc::new(PostgresDeviceTokenRepository { pool: db.pool.clone() });
    let repos = Repositories {
        categories: Arc::new(PostgresCategoryRepository { pool: db.pool.clone() }),
        offers: Arc::new(PostgresOfferRepository { pool: db.pool.clone() }),
        campaigns: Arc::new(PostgresCampaignRepository { pool: db.pool.clone() }),
        leads: Arc::new(PostgresLeadRepository { pool: db.pool.clone() }),
        devices: devices.clone(),
    };

    // Push
    let notifier = PushGateway::from_config(&config.push, devices).context("Failed to build push client")?;

    // Redis (optional)
    let rate_limit = match &config.redis {
        Some(redis) => {
            let client = RedisClient::new(&redis.url).context("Invalid Redis URL")?;
            Some(RateLimit {
                redis: Arc::new(client),
                per_minute: redis.rate_limit_per_minute,
            })
        }
        None => {
            tracing::warn!("Redis not configured, rate limiting disabled");
            None
        }
    };

    let state = AppState::build(
        repos,
        notifier,
        FeedConfig {
            default_limit: config.feed.default_limit,
            max_limit: config.feed.max_limit,
        },
        LeadConfig {
            dedup_window_hours: config.leads.dedup_window_hours,
        },
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        rate_limit,
    )
    .await
    .context("Failed to load category cache")?;

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
