use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use slotbook_api::{app, AppState, AuthConfig, Repositories};
use slotbook_core::SimulatedGateway;
use slotbook_store::app_config::{Config, StorageBackend};
use slotbook_store::{DbClient, PgBookingRepository, PgSlotRepository, PgVenueRepository, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotbook_api=debug,slotbook_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Slotbook API on port {}", config.server.port);

    let repos = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Repositories::in_memory()
        }
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Repositories {
                venues: Arc::new(PgVenueRepository::new(db.pool.clone())),
                slots: Arc::new(PgSlotRepository::new(db.pool.clone())),
                bookings: Arc::new(PgBookingRepository::new(db.pool)),
            }
        }
    };

    let redis = match config.redis.url.as_deref() {
        Some(url) => Some(Arc::new(RedisClient::new(url).await.context("Failed to open Redis client")?)),
        None => {
            tracing::info!("No redis configured, rate limiting disabled");
            None
        }
    };

    let gateway = Arc::new(SimulatedGateway::new(config.payment.delay(), config.payment.outcome()));

    let app_state = AppState::new(
        repos,
        gateway,
        config.payment.policy(),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            allow_dev_tokens: config.auth.allow_dev_tokens,
        },
        config.booking.clone(),
        redis,
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
