//! StatusWatch - website availability dashboard backend.

use statuswatch::config::ServerConfig;
use statuswatch::db::Store;
use statuswatch::refresh::{RefreshCoordinator, RefreshSettings};
use statuswatch::source::{ApiSource, DataSource};
use statuswatch::web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("statuswatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting StatusWatch on port {}...", cfg.http_port);

    // Pick the data source: a remote datastore, or the local SQLite store
    let (source, store): (Arc<dyn DataSource>, Option<Arc<Store>>) = match &cfg.api_url {
        Some(url) => {
            tracing::info!("Polling remote datastore at {}", url);
            let api: Arc<dyn DataSource> =
                Arc::new(ApiSource::new(url, cfg.api_token.clone(), cfg.fetch_timeout())?);
            (api, None)
        }
        None => {
            tracing::info!("Using database at {}", cfg.db_path);
            let store = Arc::new(Store::new(&cfg.db_path)?);
            tracing::info!("Database initialized successfully");
            let local: Arc<dyn DataSource> = store.clone();
            (local, Some(store))
        }
    };

    // Start the refresh loop
    let coordinator = Arc::new(RefreshCoordinator::new(
        source,
        RefreshSettings {
            interval: cfg.refresh_interval(),
            fetch_timeout: cfg.fetch_timeout(),
        },
    ));
    let refresh_handle = coordinator.start();

    // Start web server
    let server = Server::new(cfg, coordinator.clone(), store);
    server
        .start(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    coordinator.stop();
    refresh_handle.await?;

    Ok(())
}
