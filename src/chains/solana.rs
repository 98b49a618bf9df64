//! Solana chain integration.
//!
//! Discovery watches for new SPL mints with fresh liquidity pools
//! (pump.fun graduations, Raydium/Orca pool creation). Execution swaps
//! through an aggregator route. Both sides currently implement the
//! contract shape with placeholder observations; the RPC calls each
//! method must issue are listed in its doc comment.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{ChainExecutor, Discoverer};
use crate::types::{Candidate, Chain, ExecutionResult, ExecutionStatus, TokenFound};

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Polls Solana for new token mints.
pub struct SolanaDiscoverer {
    rpc_url: String,
    client: reqwest::Client,
}

impl SolanaDiscoverer {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Discoverer for SolanaDiscoverer {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    /// Poll for mints created since `cursor` (a slot number).
    ///
    /// The full implementation queries the RPC node for:
    /// 1. token-program signatures since the cursor slot
    ///    (`getSignaturesForAddress` on the SPL Token program),
    /// 2. `InitializeMint` instructions in those transactions,
    /// 3. matching Raydium/Orca pool creations for initial reserves,
    /// 4. creator and metadata from the mint transaction.
    async fn discover(&mut self, cursor: u64) -> Result<(Vec<TokenFound>, u64)> {
        debug!(rpc = %self.rpc_url, cursor, "polling solana for new mints");
        let _ = &self.client;
        Ok((Vec::new(), cursor))
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Swaps on Solana through an aggregator route.
pub struct SolanaExecutor {
    rpc_url: String,
    client: reqwest::Client,
    confirmations: u32,
}

impl SolanaExecutor {
    pub fn new(rpc_url: impl Into<String>, confirmations: u32) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
            confirmations,
        }
    }
}

#[async_trait]
impl ChainExecutor for SolanaExecutor {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    /// Dry-build the swap and run it through `simulateTransaction`.
    async fn simulate(&self, candidate: &Candidate) -> Result<bool> {
        debug!(
            token = %candidate.token.token_address,
            rpc = %self.rpc_url,
            "simulating solana swap"
        );
        Ok(true)
    }

    /// Build the swap instruction (Jupiter/Raydium route), create token
    /// accounts as needed, sign, send with preflight checks, and wait
    /// for `confirmations` confirmations.
    async fn execute(&self, candidate: &Candidate) -> Result<ExecutionResult> {
        debug!(
            token = %candidate.token.token_address,
            confirmations = self.confirmations,
            "executing solana swap"
        );
        let _ = &self.client;

        // Placeholder fill mirroring a confirmed aggregator swap.
        let tx_hash: String = candidate.token.token_address.chars().take(44).collect();
        Ok(ExecutionResult {
            token_address: candidate.token.token_address.clone(),
            chain: Chain::Solana,
            tx_hash,
            status: ExecutionStatus::Confirmed,
            gas_used: 0,
            slippage_actual: 0.015,
            amount_usd: candidate.decision.suggested_amount_usd,
            timestamp: Utc::now(),
            error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
