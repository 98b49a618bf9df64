//! Observability API — Axum server over the live pipeline state.
//!
//! Read-only endpoints expose candidates, telemetry, and risk state;
//! the one write endpoint resumes trading after a circuit-breaker
//! halt. CORS is open for local dashboards. A bind failure is fatal to
//! the process; everything after that runs on a background task.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use routes::ApiState;

/// Bind the API port and serve on a background task.
pub async fn spawn_api(state: ApiState, port: u16) -> Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind API port {port}"))?;
    info!(port, "API server listening");

    let app = build_router(state);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "API server error");
        }
    });

    Ok(())
}

/// Build the router with all routes and middleware.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/status", get(routes::status))
        .route("/api/candidates", get(routes::candidates))
        .route("/api/metrics", get(routes::metrics))
        .route("/api/risk", get(routes::risk_status))
        .route("/api/risk/resume", post(routes::resume_trading))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
