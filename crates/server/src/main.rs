//! Beacon server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use beacon_api::{AppState, admin_auth_middleware, router as api_router};
use beacon_common::Config;
use beacon_core::{RegistryService, WidgetService};
use beacon_store::repositories::{AnnouncementRepository, ContentRepository, MarkerRepository};
use beacon_store::{JsonFileStore, MemoryStore, StoreScopes};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting beacon server...");

    // Load configuration
    let config = Config::load()?;

    // Open the persistent store; the session store lives in memory for the
    // process lifetime.
    let persistent = Arc::new(JsonFileStore::open(&config.storage.path).await?);
    let session = Arc::new(MemoryStore::new());
    let scopes = StoreScopes::new(persistent, session);
    info!(path = %config.storage.path.display(), "Opened persistent store");

    // Repositories
    let announcement_repo = AnnouncementRepository::new(scopes.persistent.clone());
    let marker_repo = MarkerRepository::with_policy(scopes.clone(), config.widget.open_on_read_error);
    let content_repo = ContentRepository::new(scopes.persistent.clone());

    // Services
    let registry_service = RegistryService::new(announcement_repo.clone());
    let widget_service = WidgetService::new(announcement_repo, marker_repo);

    let state = AppState {
        registry_service,
        widget_service,
        content_repo,
        admin_token: config.admin.token.clone(),
    };

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
