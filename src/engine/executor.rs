//! Trade executor — per-chain execute/simulate with dry-run mode.
//!
//! In dry-run mode `execute` fabricates a confirmed result and never
//! touches a chain; risk accounting still sees it so paper trading
//! exercises the same limits as live trading. Outside dry-run the
//! candidate's chain is dispatched to its registered `ChainExecutor`.
//! A candidate with no registered executor fails with `unsupported
//! chain` rather than erroring the pipeline.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chains::base::BaseExecutor;
use crate::chains::solana::SolanaExecutor;
use crate::chains::ChainExecutor;
use crate::config::Config;
use crate::types::{Candidate, Chain, ExecutionResult, ExecutionStatus};

pub struct Executor {
    config: Arc<Config>,
    chains: Vec<Box<dyn ChainExecutor>>,
}

impl Executor {
    /// Build an executor with both chains registered.
    pub fn new(config: Arc<Config>) -> Self {
        let chains: Vec<Box<dyn ChainExecutor>> = vec![
            Box::new(SolanaExecutor::new(
                config.solana_rpc_url.clone(),
                config.confirmations_wait,
            )),
            Box::new(BaseExecutor::new(
                config.base_rpc_url.clone(),
                config.confirmations_wait,
            )),
        ];
        Self::with_chains(config, chains)
    }

    /// Build an executor over a specific set of chain backends.
    pub fn with_chains(config: Arc<Config>, chains: Vec<Box<dyn ChainExecutor>>) -> Self {
        Self { config, chains }
    }

    fn executor_for(&self, chain: Chain) -> Option<&dyn ChainExecutor> {
        self.chains
            .iter()
            .find(|e| e.chain() == chain)
            .map(|executor| executor.as_ref())
    }

    /// Simulate the swap for a candidate. `Ok(false)` means the chain's
    /// simulation reported failure.
    pub async fn simulate(&self, candidate: &Candidate) -> Result<bool> {
        match self.executor_for(candidate.token.chain) {
            Some(executor) => executor.simulate(candidate).await,
            None => {
                warn!(
                    chain = %candidate.token.chain,
                    token = %candidate.token.token_address,
                    "no executor registered for chain, simulation fails"
                );
                Ok(false)
            }
        }
    }

    /// Execute the trade for a candidate.
    pub async fn execute(&self, candidate: &Candidate) -> Result<ExecutionResult> {
        let token = &candidate.token;

        if self.config.dry_run {
            info!(
                token = %token.token_address,
                amount = format!("${:.2}", candidate.decision.suggested_amount_usd),
                "[DRY RUN] would execute trade"
            );
            return Ok(ExecutionResult {
                token_address: token.token_address.clone(),
                chain: token.chain,
                tx_hash: format!("DRY_RUN_TX_{}", token.token_address),
                status: ExecutionStatus::Confirmed,
                gas_used: 0,
                slippage_actual: 0.0,
                amount_usd: candidate.decision.suggested_amount_usd,
                timestamp: Utc::now(),
                error: None,
            });
        }

        match self.executor_for(token.chain) {
            Some(executor) => {
                let result = executor.execute(candidate).await?;
                info!(
                    token = %token.token_address,
                    tx = %result.tx_hash,
                    status = %result.status,
                    "trade executed"
                );
                Ok(result)
            }
            None => {
                warn!(
                    chain = %token.chain,
                    token = %token.token_address,
                    "unsupported chain"
                );
                Ok(ExecutionResult {
                    token_address: token.token_address.clone(),
                    chain: token.chain,
                    tx_hash: String::new(),
                    status: ExecutionStatus::Failed,
                    gas_used: 0,
                    slippage_actual: 0.0,
                    amount_usd: 0.0,
                    timestamp: Utc::now(),
                    error: Some("unsupported chain".to_string()),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
