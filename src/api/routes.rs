//! API route handlers. All endpoints return JSON in snake_case,
//! matching the data-model serialization.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::engine::listing::Listing;
use crate::strategy::risk::RiskManager;
use crate::telemetry::{Metrics, Telemetry};
use crate::types::{Candidate, RiskState};

/// Shared handles into the live pipeline.
#[derive(Clone)]
pub struct ApiState {
    pub listing: Arc<Listing>,
    pub risk: Arc<RiskManager>,
    pub telemetry: Arc<Telemetry>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub candidate_count: usize,
    pub trading_halted: bool,
    pub metrics: StatusMetrics,
}

/// Counter summary embedded in the status response.
#[derive(Debug, Serialize)]
pub struct StatusMetrics {
    pub tokens_found: u64,
    pub tokens_filtered: u64,
    pub candidates: u64,
    pub executions: u64,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub count: usize,
    pub candidates: Vec<Candidate>,
}

/// Full telemetry snapshot; durations exposed as milliseconds.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub tokens_found: u64,
    pub tokens_filtered: u64,
    pub tokens_dropped: u64,
    pub safety_checks: u64,
    pub honeypots_detected: u64,
    pub safe_tokens: u64,
    pub evaluations: u64,
    pub candidates_listed: u64,
    pub trades_executed: u64,
    pub execution_success: u64,
    pub execution_failed: u64,
    pub simulation_failed: u64,
    pub total_invested: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub avg_decision_latency_ms: f64,
    pub avg_execution_time_ms: f64,
}

impl From<Metrics> for MetricsResponse {
    fn from(m: Metrics) -> Self {
        Self {
            tokens_found: m.tokens_found,
            tokens_filtered: m.tokens_filtered,
            tokens_dropped: m.tokens_dropped,
            safety_checks: m.safety_checks,
            honeypots_detected: m.honeypots_detected,
            safe_tokens: m.safe_tokens,
            evaluations: m.evaluations,
            candidates_listed: m.candidates_listed,
            trades_executed: m.trades_executed,
            execution_success: m.execution_success,
            execution_failed: m.execution_failed,
            simulation_failed: m.simulation_failed,
            total_invested: m.total_invested,
            total_profit: m.total_profit,
            total_loss: m.total_loss,
            avg_decision_latency_ms: m.avg_decision_latency.as_secs_f64() * 1_000.0,
            avg_execution_time_ms: m.avg_execution_time.as_secs_f64() * 1_000.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub status: &'static str,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        time: Utc::now().to_rfc3339(),
    })
}

/// GET /api/status
pub async fn status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let metrics = state.telemetry.snapshot();
    Json(StatusResponse {
        status: "running",
        candidate_count: state.listing.candidate_count(),
        trading_halted: state.risk.get_status().trading_halted,
        metrics: StatusMetrics {
            tokens_found: metrics.tokens_found,
            tokens_filtered: metrics.tokens_filtered,
            candidates: metrics.candidates_listed,
            executions: metrics.trades_executed,
        },
    })
}

/// GET /api/candidates
pub async fn candidates(State(state): State<ApiState>) -> Json<CandidatesResponse> {
    let candidates = state.listing.all_candidates();
    Json(CandidatesResponse {
        count: candidates.len(),
        candidates,
    })
}

/// GET /api/metrics
pub async fn metrics(State(state): State<ApiState>) -> Json<MetricsResponse> {
    Json(state.telemetry.snapshot().into())
}

/// GET /api/risk
pub async fn risk_status(State(state): State<ApiState>) -> Json<RiskState> {
    Json(state.risk.get_status())
}

/// POST /api/risk/resume
pub async fn resume_trading(State(state): State<ApiState>) -> Json<ResumeResponse> {
    state.risk.resume_trading();
    Json(ResumeResponse {
        status: "ok",
        message: "Trading resumed",
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
