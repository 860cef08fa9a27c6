use crate::acquisition::Acquirer;
use crate::config::Config;
use crate::retention::{RetentionPolicy, RetentionScheduler};
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use vidrelay_store::FileStore;

pub mod routes_files;
pub mod routes_home;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Directory holding the downloaded media
    pub store: FileStore,
    /// Owner of the one-shot deletions and the periodic sweep
    pub scheduler: RetentionScheduler,
    pub acquirer: Arc<Acquirer>,
}

impl AppContext {
    /// Wire the store, scheduler and acquirer from config.
    ///
    /// The scheduler is created stopped; call [`RetentionScheduler::start`]
    /// to begin sweeping.
    pub fn new(config: Config) -> Self {
        let store = FileStore::new(&config.storage.dir);
        let scheduler =
            RetentionScheduler::new(store.clone(), RetentionPolicy::from(&config.storage));
        let acquirer = Acquirer::from_config(&config, store.clone(), scheduler.clone());

        Self {
            config: Arc::new(config),
            store,
            scheduler,
            acquirer: Arc::new(acquirer),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE])
        .expose_headers([
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
        ]);

    Router::new()
        .route("/health", get(health_check))
        .merge(routes_home::home_routes())
        .nest("/api", routes_files::files_routes())
        .nest("/watch", streaming::watch_router())
        .nest("/downloads", streaming::download_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server and the retention scheduler, until shutdown.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config);
    ctx.store
        .ensure_root()
        .await
        .with_context(|| format!("Failed to create storage directory {:?}", ctx.store.root()))?;

    ctx.scheduler.start();
    let scheduler = ctx.scheduler.clone();

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.stop().await;
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
