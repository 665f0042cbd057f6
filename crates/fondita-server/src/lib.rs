//! HTTP server for the Fondita menu.
//!
//! Public routes serve the menu and the static site; admin routes sit
//! behind [`auth::require_session`]. Saving the menu triggers replication
//! to the production repository.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use fondita_core::config::RootConfig;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub use state::AppState;

/// Room for multipart framing around the largest accepted image.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = usize::try_from(state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    let admin = Router::new()
        .route("/logout", post(routes::logout))
        .route("/api/menu", post(routes::save_menu))
        .route("/api/save-and-sync", post(routes::save_and_sync))
        .route(
            "/api/upload-image",
            post(routes::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/check-session", get(routes::check_session))
        .route("/api/sync-status", get(routes::sync_status))
        .route_layer(from_fn_with_state(state.clone(), auth::require_session));

    let public = Router::new()
        .route("/login", post(routes::login))
        .route("/api/menu", get(routes::get_menu))
        .route("/api/version", get(routes::version));

    Router::new()
        .merge(admin)
        .merge(public)
        .nest_service("/img", ServeDir::new(state.paths.image_dir()))
        .fallback_service(ServeDir::new(state.paths.public_dir()))
        .layer(from_fn(telemetry::trace_requests))
        .with_state(state)
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));
    if origin == "*" {
        return Ok(cors.allow_origin(Any));
    }
    let origin = HeaderValue::from_str(origin).context("invalid server.cors_origin")?;
    Ok(cors.allow_origin(origin))
}

/// Runs the server until Ctrl+C or SIGTERM.
///
/// On shutdown, in-flight requests drain first, then the replication
/// worker finishes its current run.
pub async fn start_server(config: RootConfig) -> anyhow::Result<()> {
    tracing::info!("Starting server...");

    let cancel = CancellationToken::new();
    let state = AppState::from_config(&config, cancel.clone())
        .await
        .context("failed to initialize application state")?;
    let scheduler = state.scheduler.clone();

    let mut app = build_router(state);
    if let Some(origin) = config.server.cors_origin.as_deref() {
        app = app.layer(cors_layer(origin)?);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cancel.cancel();
    scheduler.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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
}
