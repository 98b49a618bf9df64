//! Strategy evaluator — deterministic scoring of evaluated tokens.
//!
//! Pure arithmetic over the safety report, off-chain metrics, and
//! pre-filter annotations; no I/O and no randomness, so identical
//! inputs always yield the identical decision. Each factor that moves
//! the score leaves a rationale tag on the decision.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::types::{
    Action, Confidence, Decision, OffChainMetrics, PreFiltered, Priority, SafetyReport, Velocity,
};

/// Volatility assumed for fresh meme-coin positions.
const ROI_STD_DEV: f64 = 0.25;

/// Smallest position worth the fees.
const MIN_POSITION_USD: f64 = 100.0;

pub struct StrategyEvaluator {
    config: Arc<Config>,
}

impl StrategyEvaluator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Score a token and produce a complete decision.
    pub fn evaluate(
        &self,
        safety: &SafetyReport,
        offchain: &OffChainMetrics,
        token: &PreFiltered,
    ) -> Decision {
        let mut rationale = Vec::new();

        let win_probability = self.win_probability(safety, offchain, token, &mut rationale);
        let expected_roi = self.expected_roi(offchain, token);
        let confidence = self.confidence(safety, offchain, win_probability);
        let action = self.action(win_probability, confidence);

        let decision = Decision {
            token_address: token.token.token_address.clone(),
            chain: token.token.chain,
            win_probability,
            expected_roi,
            expected_roi_std: ROI_STD_DEV,
            confidence,
            action,
            suggested_amount_usd: self.position_size(confidence),
            stop_loss_pct: confidence.stop_loss_pct(),
            take_profit_pct: take_profit(expected_roi),
            time_horizon_minutes: confidence.time_horizon_minutes(),
            rationale,
            evaluated_at: Utc::now(),
        };

        debug!(
            token = %decision.token_address,
            win_probability = format!("{:.2}", decision.win_probability),
            action = %decision.action,
            confidence = %decision.confidence,
            "strategy decision"
        );

        decision
    }

    /// Win probability in [0, 1]. A token that cannot round-trip a
    /// trade scores zero immediately.
    fn win_probability(
        &self,
        safety: &SafetyReport,
        offchain: &OffChainMetrics,
        token: &PreFiltered,
        rationale: &mut Vec<String>,
    ) -> f64 {
        if !(safety.can_buy && safety.can_sell) {
            rationale.push("cannot_trade".to_string());
            return 0.0;
        }

        let mut prob: f64 = 0.5;
        prob += 0.15;
        rationale.push("can_trade".to_string());

        if safety.honeypot_score < 0.1 {
            prob += 0.10;
            rationale.push("low_honeypot_score".to_string());
        } else if safety.honeypot_score > self.config.max_honeypot_score {
            prob -= 0.20;
            rationale.push("high_honeypot_score".to_string());
        }

        if safety.liquidity_locked {
            prob += 0.08;
            rationale.push("liquidity_locked".to_string());
        }

        if safety.owner_controls.renounced {
            prob += 0.07;
            rationale.push("owner_renounced".to_string());
        }

        if !safety.owner_controls.has_blacklist && !safety.owner_controls.has_transfer_hook {
            prob += 0.05;
            rationale.push("no_transfer_restrictions".to_string());
        }

        if offchain.volume_24h_dex >= self.config.min_volume_dex {
            prob += 0.10;
            rationale.push("good_dex_volume".to_string());
        }

        if offchain.total_mentions() > 50 {
            prob += 0.08;
            rationale.push("social_activity".to_string());
        }

        match offchain.velocity {
            Velocity::Rising => {
                prob += 0.07;
                rationale.push("rising_velocity".to_string());
            }
            Velocity::Falling => prob -= 0.10,
            Velocity::Stable => {}
        }

        let liquidity = &token.token.initial_liquidity;
        let ratio = liquidity.reserve_native / (liquidity.reserve_native + liquidity.reserve_token);
        if !(0.3..=0.7).contains(&ratio) {
            prob -= 0.05;
            rationale.push("liquidity_imbalance".to_string());
        }

        match token.priority {
            Priority::High => prob += 0.05,
            Priority::Low => prob -= 0.05,
            Priority::Medium => {}
        }

        prob.clamp(0.0, 1.0)
    }

    /// Expected mean return.
    fn expected_roi(&self, offchain: &OffChainMetrics, token: &PreFiltered) -> f64 {
        let mut roi = 0.15;

        if offchain.volume_24h_dex > self.config.min_volume_dex * 2.0 {
            roi += 0.10;
        }
        if token.token.initial_liquidity.reserve_native > self.config.min_liquidity * 2.0 {
            roi += 0.08;
        }
        if offchain.velocity == Velocity::Rising {
            roi += 0.12;
        }

        roi
    }

    fn confidence(
        &self,
        safety: &SafetyReport,
        offchain: &OffChainMetrics,
        win_probability: f64,
    ) -> Confidence {
        if win_probability >= 0.85
            && safety.honeypot_score < 0.1
            && offchain.volume_24h_dex > self.config.min_volume_dex
        {
            Confidence::High
        } else if win_probability >= 0.70 && safety.honeypot_score < 0.2 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    fn action(&self, win_probability: f64, confidence: Confidence) -> Action {
        if win_probability >= self.config.win_probability_threshold
            && confidence != Confidence::Low
        {
            if self.config.auto_execute {
                Action::Buy
            } else {
                Action::List
            }
        } else if win_probability >= 0.60 {
            Action::Monitor
        } else {
            Action::Skip
        }
    }

    /// Confidence-scaled slice of the single-position cap, floored at
    /// the minimum viable position.
    fn position_size(&self, confidence: Confidence) -> f64 {
        let max_position = self.config.account_balance * self.config.single_position_pct;
        let suggested = max_position * confidence.position_multiplier();
        round2(suggested.max(MIN_POSITION_USD))
    }
}

fn take_profit(expected_roi: f64) -> f64 {
    round2((expected_roi * 1.5).clamp(0.20, 1.00))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
