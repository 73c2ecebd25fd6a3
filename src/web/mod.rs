//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::refresh::RefreshCoordinator;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub coordinator: Arc<RefreshCoordinator>,
    /// Present when this process owns the datastore.
    pub store: Option<Arc<Store>>,
}

/// Web server for StatusWatch.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(
        config: ServerConfig,
        coordinator: Arc<RefreshCoordinator>,
        store: Option<Arc<Store>>,
    ) -> Self {
        Self {
            state: AppState {
                config,
                coordinator,
                store,
            },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let mut router = Router::new()
            .route("/api/status", get(handlers::handle_get_status))
            .route("/api/refresh", post(handlers::handle_refresh))
            .route("/api/targets", post(handlers::handle_add_target));

        if self.state.store.is_some() {
            let datastore = Router::new()
                .route("/api/v1/websites", get(handlers::handle_get_websites))
                .route(
                    "/api/v1/website",
                    post(handlers::handle_create_website).delete(handlers::handle_delete_website),
                )
                .route("/api/v1/website/status", get(handlers::handle_get_website_status))
                .route("/api/v1/website/{id}/ticks", post(handlers::handle_add_ticks))
                .route_layer(middleware::from_fn_with_state(
                    self.state.clone(),
                    handlers::require_token,
                ));
            router = router.merge(datastore);
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Serve on the configured port until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
