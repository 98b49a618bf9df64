//! Safety evaluator — honeypot scoring and owner-control checks.
//!
//! Dispatches on chain; each chain routine observes a simulated sell
//! and the token's owner controls, then the weighted score below turns
//! those observations into a honeypot score in [0, 1]. Every triggered
//! weight leaves a reason tag, so a score of 1.0 always comes with at
//! least one hard-fail reason. RPC failures surface as errors; the
//! pipeline drops the token but the scanner keeps running.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::types::{Chain, OwnerControls, PreFiltered, SafetyReport, SimulatedSell};

pub struct SafetyEvaluator {
    config: Arc<Config>,
}

impl SafetyEvaluator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Evaluate a token's on-chain safety.
    pub async fn evaluate(&self, token: &PreFiltered) -> Result<SafetyReport> {
        debug!(
            token = %token.token.token_address,
            chain = %token.token.chain,
            "evaluating token safety"
        );

        let mut report = SafetyReport {
            token_address: token.token.token_address.clone(),
            chain: token.token.chain,
            can_buy: true,
            can_sell: true,
            honeypot_score: 0.0,
            liquidity_locked: false,
            owner_controls: OwnerControls::default(),
            simulated_sell: SimulatedSell::default(),
            reasons: Vec::new(),
            evaluated_at: Utc::now(),
        };

        match token.token.chain {
            Chain::Base => self.inspect_base(token, &mut report).await?,
            Chain::Solana => self.inspect_solana(token, &mut report).await?,
        }

        score_report(&mut report);

        info!(
            token = %report.token_address,
            can_buy = report.can_buy,
            can_sell = report.can_sell,
            honeypot_score = format!("{:.2}", report.honeypot_score),
            "safety evaluation complete"
        );

        Ok(report)
    }

    /// Base (EVM) checks.
    ///
    /// The full routine simulates a buy and a sell via `eth_call`,
    /// scans the bytecode for transfer restrictions and known honeypot
    /// patterns, reads tax/limit parameters, and checks owner and
    /// liquidity-lock status. The placeholder observations below match
    /// a typical clean launch until that lands.
    async fn inspect_base(&self, token: &PreFiltered, report: &mut SafetyReport) -> Result<()> {
        debug!(token = %token.token.token_address, rpc = %self.config.base_rpc_url, "base safety checks");

        report.simulated_sell = SimulatedSell {
            success: true,
            slippage: 0.01,
            gas_used: 150_000,
            error: None,
        };
        report.owner_controls = OwnerControls {
            renounced: true,
            has_blacklist: false,
            max_tx_limit: 0.0,
            tax_fee: 0.05,
            has_transfer_hook: false,
        };

        if report.owner_controls.tax_fee > 0.10 {
            report.reasons.push("high_tax_fee".to_string());
        }
        if !report.owner_controls.renounced {
            report.reasons.push("owner_not_renounced".to_string());
        }
        Ok(())
    }

    /// Solana checks.
    ///
    /// The full routine runs `simulateTransaction` for a sell, checks
    /// mint and freeze authority, token-2022 transfer hooks, and holder
    /// distribution. Placeholder observations until then.
    async fn inspect_solana(&self, token: &PreFiltered, report: &mut SafetyReport) -> Result<()> {
        debug!(token = %token.token.token_address, rpc = %self.config.solana_rpc_url, "solana safety checks");

        report.simulated_sell = SimulatedSell {
            success: true,
            slippage: 0.015,
            gas_used: 0,
            error: None,
        };
        report.owner_controls = OwnerControls {
            renounced: true,
            has_blacklist: false,
            max_tx_limit: 0.0,
            tax_fee: 0.0,
            has_transfer_hook: false,
        };

        if !report.owner_controls.renounced {
            report.reasons.push("owner_not_renounced".to_string());
        }
        Ok(())
    }

    /// Whether a token passes the hard trade gates.
    pub fn can_trade(&self, report: &SafetyReport) -> bool {
        report.can_buy
            && report.can_sell
            && report.honeypot_score < self.config.max_honeypot_score
            && report.simulated_sell.slippage < self.config.max_slippage
    }
}

/// Weighted honeypot score, clamped to [0, 1]. Each triggered condition
/// tags the report so the score is explainable.
fn score_report(report: &mut SafetyReport) {
    let mut score: f64 = 0.0;

    if !report.can_sell {
        score += 0.50;
        report.reasons.push("cannot_sell".to_string());
    }
    if !report.can_buy {
        score += 0.30;
        report.reasons.push("cannot_buy".to_string());
    }
    if report.simulated_sell.slippage > 0.10 {
        score += 0.20;
        report.reasons.push("high_sell_slippage".to_string());
    }
    if !report.owner_controls.renounced {
        score += 0.10;
    }
    if report.owner_controls.has_blacklist {
        score += 0.15;
        report.reasons.push("has_blacklist".to_string());
    }
    if report.owner_controls.has_transfer_hook {
        score += 0.10;
        report.reasons.push("has_transfer_hook".to_string());
    }
    if report.owner_controls.tax_fee > 0.15 {
        score += 0.10;
    }
    if !report.liquidity_locked {
        score += 0.05;
        report.reasons.push("liquidity_unlocked".to_string());
    }

    report.honeypot_score = score.min(1.0);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
