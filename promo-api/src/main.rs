use anyhow::Context;
use promo_api::{app, AppState, AuthConfig};
use promo_core::{OfferNotifier, OfferRepository};
use promo_store::app_config::{Config, StorageBackend};
use promo_store::{DbClient, InMemoryOfferRepository, LocalImageStore, PostgresOfferRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "promo_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(?config, "Starting promo API on port {}", config.server.port);

    let repo: Arc<dyn OfferRepository> = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(config.database.url.expose(), config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PostgresOfferRepository::new(db.pool.clone()))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory offer storage; data is lost on restart");
            Arc::new(InMemoryOfferRepository::new())
        }
    };

    let images = Arc::new(LocalImageStore::new(
        &config.uploads.root,
        config.uploads.max_image_bytes,
    ));
    let notifier = OfferNotifier::new(config.notifications.channel_capacity);

    let app_state = AppState::new(
        repo,
        images,
        notifier,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        config.uploads.max_image_bytes,
    )
    .with_internal_errors_exposed(config.server.is_development());

    let app = app(app_state, &config.uploads.root);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
