//! mintpipe — event-driven new-mint trading pipeline.
//!
//! Entry point. Loads configuration from the environment, initialises
//! structured logging, starts the orchestrator and the observability
//! API, and runs until a shutdown signal arrives.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use mintpipe::api::{self, routes::ApiState};
use mintpipe::config::Config;
use mintpipe::engine::orchestrator::Orchestrator;

const BANNER: &str = r#"
             _       _         _
  _ __ ___  (_)_ __ | |_ _ __ (_)_ __   ___
 | '_ ` _ \ | | '_ \| __| '_ \| | '_ \ / _ \
 | | | | | || | | | | |_| |_) | | |_) |  __/
 |_| |_| |_||_|_| |_|\__| .__/|_| .__/ \___|
                        |_|     |_|
  New-mint discovery and execution pipeline
  v0.1.0 — Solana + Base
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Bad config is fatal before anything spins up.
    let config = Arc::new(Config::from_env()?);

    init_logging();
    println!("{BANNER}");
    info!(
        dry_run = config.dry_run,
        auto_execute = config.auto_execute,
        solana_interval_secs = config.scan_interval_solana.as_secs(),
        base_interval_secs = config.scan_interval_base.as_secs(),
        account_balance = config.account_balance,
        "mintpipe starting up"
    );

    let mut orchestrator = Orchestrator::new(Arc::clone(&config));

    // The API shares live handles with the pipeline; a bind failure is
    // fatal before trading starts.
    let state = ApiState {
        listing: orchestrator.listing(),
        risk: orchestrator.risk(),
        telemetry: orchestrator.telemetry(),
    };
    api::spawn_api(state, config.api_port).await?;

    tokio::select! {
        result = orchestrator.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    orchestrator.shutdown().await;
    info!("mintpipe shut down cleanly");
    Ok(())
}

/// Initialise the `tracing` subscriber. `LOG_JSON` switches to JSON
/// output for log shippers.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mintpipe=info"));

    if std::env::var("LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
