//! Chain integrations.
//!
//! Defines the two seams the pipeline needs from a blockchain:
//! - `Discoverer` — poll for tokens minted since a cursor (scanner side)
//! - `ChainExecutor` — simulate and execute a swap (execution side)
//!
//! Implementations exist for Solana and Base. The RPC plumbing behind
//! them is a documented contract; tests substitute scripted fakes.

pub mod base;
pub mod solana;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Candidate, Chain, ExecutionResult, TokenFound};

/// Polls a chain for freshly-minted tokens.
///
/// `discover` returns every token created since `cursor` together with
/// the new cursor to resume from (a slot number on Solana, a block
/// number on Base). Implementations must be cheap to call on every
/// scanner tick and must not block indefinitely.
#[async_trait]
pub trait Discoverer: Send {
    /// Chain this discoverer watches.
    fn chain(&self) -> Chain;

    /// Fetch tokens minted since `cursor`. Returns the discoveries plus
    /// the cursor to pass on the next tick.
    async fn discover(&mut self, cursor: u64) -> Result<(Vec<TokenFound>, u64)>;
}

/// Executes (or simulates) a swap for a candidate on one chain.
///
/// The execution contract: build the swap, sign it, broadcast, wait for
/// the configured number of confirmations, and fill `gas_used`,
/// `slippage_actual`, and `tx_hash` in the result. `simulate` performs
/// the same build but stops at the node's simulation endpoint.
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    /// Chain this executor trades on.
    fn chain(&self) -> Chain;

    /// Simulate the swap without broadcasting. `Ok(false)` means the
    /// simulation itself reported failure (distinct from an RPC error).
    async fn simulate(&self, candidate: &Candidate) -> Result<bool>;

    /// Execute the swap and wait for confirmation.
    async fn execute(&self, candidate: &Candidate) -> Result<ExecutionResult>;
}
