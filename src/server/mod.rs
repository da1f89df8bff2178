//! HTTP server and shared application context.
//!
//! The [`AppContext`] is the explicitly constructed shared state handed to
//! every request handler: the job registry, the discovered tool registry,
//! and the mutable configuration. It is built at service start and torn down
//! at service stop; nothing lives in module-level globals.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use clipforge_av::ToolRegistry;
use clipforge_core::config::Config;

use crate::jobs::JobRegistry;

pub mod error;
pub mod routes_config;
pub mod routes_files;
pub mod routes_jobs;
pub mod routes_tools;

/// Shared application context.
///
/// Cheaply cloneable: only `Arc`s inside.
#[derive(Clone)]
pub struct AppContext {
    /// In-memory job registry; lost on restart, by design.
    pub registry: Arc<JobRegistry>,
    /// Discovered external tools. Re-discovered when tool paths change via
    /// the config API.
    pub tools: Arc<RwLock<ToolRegistry>>,
    /// Mutable configuration (editable via API).
    pub config: Arc<RwLock<Config>>,
    /// Path to the config file (for persistence); `None` disables saving.
    pub config_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        Self {
            registry: Arc::new(JobRegistry::new()),
            tools: Arc::new(RwLock::new(tools)),
            config: Arc::new(RwLock::new(config)),
            config_path,
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/tools", get(routes_tools::list_tools))
        .route("/tools/check", get(routes_tools::check_tools))
        .route("/tools/:id", get(routes_tools::get_tool))
        .route("/tools/:id/run", post(routes_tools::run_tool))
        .route("/jobs", get(routes_jobs::list_jobs))
        .route("/jobs/:id", get(routes_jobs::get_job))
        .route("/jobs/:id/cancel", post(routes_jobs::cancel_job))
        .route("/download/:id", get(routes_jobs::download))
        .route("/upload", post(routes_files::upload))
        .route("/probe", get(routes_files::probe))
        .route(
            "/config",
            get(routes_config::get_config).put(routes_config::update_config),
        )
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server and block until shutdown.
pub async fn start_server(config: Config, config_path: Option<PathBuf>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    std::fs::create_dir_all(&config.storage.upload_dir)
        .context("Failed to create upload directory")?;
    std::fs::create_dir_all(&config.storage.output_dir)
        .context("Failed to create output directory")?;

    let ctx = AppContext::new(config, config_path);
    for info in ctx.tools.read().check_all() {
        if info.available {
            tracing::info!("{} found at {:?}", info.name, info.path.as_ref().unwrap());
        } else {
            tracing::warn!("{} not found; runs will fail until it is installed", info.name);
        }
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
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
