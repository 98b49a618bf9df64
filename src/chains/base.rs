//! Base (EVM) chain integration.
//!
//! Discovery watches Uniswap factory `PairCreated` events; execution
//! swaps through the router. Placeholder observations stand in for the
//! RPC calls, which are listed per method.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{ChainExecutor, Discoverer};
use crate::types::{Candidate, Chain, ExecutionResult, ExecutionStatus, TokenFound};

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Polls Base for new ERC-20 pairs.
pub struct BaseDiscoverer {
    rpc_url: String,
    client: reqwest::Client,
}

impl BaseDiscoverer {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Discoverer for BaseDiscoverer {
    fn chain(&self) -> Chain {
        Chain::Base
    }

    /// Poll for pairs created since `cursor` (a block number).
    ///
    /// The full implementation issues `eth_getLogs` for the Uniswap
    /// factory `PairCreated` topic over `[cursor, latest]`, reads
    /// initial reserves from each new pair contract, and pulls ERC-20
    /// metadata (name, symbol, decimals) from the token contract.
    async fn discover(&mut self, cursor: u64) -> Result<(Vec<TokenFound>, u64)> {
        debug!(rpc = %self.rpc_url, cursor, "polling base for new pairs");
        let _ = &self.client;
        Ok((Vec::new(), cursor))
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Swaps on Base through the router contract.
pub struct BaseExecutor {
    rpc_url: String,
    client: reqwest::Client,
    confirmations: u32,
}

impl BaseExecutor {
    pub fn new(rpc_url: impl Into<String>, confirmations: u32) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
            confirmations,
        }
    }
}

#[async_trait]
impl ChainExecutor for BaseExecutor {
    fn chain(&self) -> Chain {
        Chain::Base
    }

    /// Run the swap calldata through `eth_call` without broadcasting.
    async fn simulate(&self, candidate: &Candidate) -> Result<bool> {
        debug!(
            token = %candidate.token.token_address,
            rpc = %self.rpc_url,
            "simulating base swap"
        );
        Ok(true)
    }

    /// Build `swapExactETHForTokens` calldata, manage nonce and gas,
    /// sign, broadcast, and wait for `confirmations` blocks; fill
    /// `gas_used` and `slippage_actual` from the receipt.
    async fn execute(&self, candidate: &Candidate) -> Result<ExecutionResult> {
        debug!(
            token = %candidate.token.token_address,
            confirmations = self.confirmations,
            "executing base swap"
        );
        let _ = &self.client;

        // Placeholder fill mirroring a confirmed router swap.
        let suffix: String = candidate
            .token
            .token_address
            .trim_start_matches("0x")
            .chars()
            .take(40)
            .collect();
        Ok(ExecutionResult {
            token_address: candidate.token.token_address.clone(),
            chain: Chain::Base,
            tx_hash: format!("0x{suffix}"),
            status: ExecutionStatus::Confirmed,
            gas_used: 150_000,
            slippage_actual: 0.02,
            amount_usd: candidate.decision.suggested_amount_usd,
            timestamp: Utc::now(),
            error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
