//! Risk manager — exposure accounting and the circuit breaker.
//!
//! A small state machine over `RiskState`, serialized by one exclusive
//! lock. Nothing here performs I/O, so the lock is never held across an
//! await. The circuit breaker (HALTED) trips when cumulative daily loss
//! reaches the limit and only a manual resume clears it; the daily
//! reset zeroes the loss counter but deliberately leaves the halt flag
//! alone.

use std::sync::Mutex;

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::types::{Decision, ExecutionResult, ExecutionStatus, RiskState};

/// Why the risk manager refused an execution. The tags are stable
/// strings surfaced in logs and candidate records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskRejection {
    #[error("trading halted by circuit breaker")]
    TradingHalted,
    #[error("suggested amount exceeds single position limit")]
    ExceedsSinglePositionLimit,
    #[error("would exceed total exposure limit")]
    ExceedsTotalExposureLimit,
    #[error("daily loss limit reached")]
    DailyLossLimitReached,
}

impl RiskRejection {
    pub fn tag(&self) -> &'static str {
        match self {
            RiskRejection::TradingHalted => "trading_halted",
            RiskRejection::ExceedsSinglePositionLimit => "exceeds_single_position_limit",
            RiskRejection::ExceedsTotalExposureLimit => "exceeds_total_exposure_limit",
            RiskRejection::DailyLossLimitReached => "daily_loss_limit_reached",
        }
    }
}

pub struct RiskManager {
    state: Mutex<RiskState>,
}

impl RiskManager {
    pub fn new(config: &Config) -> Self {
        Self {
            state: Mutex::new(RiskState {
                single_position_pct: config.single_position_pct,
                total_exposure_pct: config.total_exposure_pct,
                daily_loss_limit: config.daily_loss_limit,
                account_balance: config.account_balance,
                current_exposure: 0.0,
                daily_loss: 0.0,
                trading_halted: false,
                last_reset_time: Utc::now(),
            }),
        }
    }

    /// Gate an execution. Checks run in order: halt flag, single
    /// position limit, total exposure limit, daily loss limit. Hitting
    /// the daily loss limit trips the circuit breaker before returning.
    pub fn can_execute(&self, decision: &Decision) -> Result<(), RiskRejection> {
        let mut state = self.state.lock().unwrap();

        if state.trading_halted {
            return Err(RiskRejection::TradingHalted);
        }

        let max_single = state.account_balance * state.single_position_pct;
        if decision.suggested_amount_usd > max_single {
            warn!(
                token = %decision.token_address,
                suggested = decision.suggested_amount_usd,
                limit = max_single,
                "rejected: single position limit"
            );
            return Err(RiskRejection::ExceedsSinglePositionLimit);
        }

        let max_exposure = state.account_balance * state.total_exposure_pct;
        if state.current_exposure + decision.suggested_amount_usd > max_exposure {
            warn!(
                token = %decision.token_address,
                would_be = state.current_exposure + decision.suggested_amount_usd,
                limit = max_exposure,
                "rejected: total exposure limit"
            );
            return Err(RiskRejection::ExceedsTotalExposureLimit);
        }

        if state.daily_loss >= state.daily_loss_limit {
            warn!(daily_loss = state.daily_loss, "rejected: daily loss limit, halting");
            state.trading_halted = true;
            return Err(RiskRejection::DailyLossLimitReached);
        }

        Ok(())
    }

    /// Record a finished execution; confirmed trades add to exposure
    /// (dry-run results included — their accounting must match the risk
    /// decisions that admitted them).
    pub fn record_execution(&self, result: &ExecutionResult) {
        if result.status != ExecutionStatus::Confirmed {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.current_exposure += result.amount_usd;
        info!(
            token = %result.token_address,
            exposure = format!("${:.2}", state.current_exposure),
            "execution recorded"
        );
    }

    /// Record realized P&L from a closed position. Losses accumulate
    /// toward the daily limit and trip the breaker when they reach it.
    pub fn record_profit(&self, token_address: &str, pnl: f64) {
        let mut state = self.state.lock().unwrap();
        if pnl < 0.0 {
            state.daily_loss += -pnl;
            warn!(
                token = %token_address,
                loss = -pnl,
                daily_loss = format!("${:.2}", state.daily_loss),
                "loss recorded"
            );
            if state.daily_loss >= state.daily_loss_limit {
                state.trading_halted = true;
                warn!("circuit breaker tripped: daily loss limit reached");
            }
        } else {
            info!(token = %token_address, profit = pnl, "profit recorded");
        }
    }

    /// Release exposure when a position closes. Never goes negative.
    pub fn release_exposure(&self, amount: f64) {
        let mut state = self.state.lock().unwrap();
        state.current_exposure = (state.current_exposure - amount).max(0.0);
        info!(
            exposure = format!("${:.2}", state.current_exposure),
            "exposure released"
        );
    }

    /// Manual override: clear the halt flag. Counters are untouched.
    pub fn resume_trading(&self) {
        let mut state = self.state.lock().unwrap();
        state.trading_halted = false;
        info!("trading resumed");
    }

    /// Zero the daily loss counter and stamp the reset time. Does not
    /// clear a halt.
    pub fn reset_daily(&self) {
        let mut state = self.state.lock().unwrap();
        state.daily_loss = 0.0;
        state.last_reset_time = Utc::now();
        info!("daily risk counters reset");
    }

    /// Run the daily reset if more than 24 hours have passed since the
    /// last one.
    pub fn check_daily_reset(&self) {
        let mut state = self.state.lock().unwrap();
        if Utc::now() - state.last_reset_time > Duration::hours(24) {
            state.daily_loss = 0.0;
            state.last_reset_time = Utc::now();
            info!("daily risk counters reset (24h elapsed)");
        }
    }

    /// Deep-copy snapshot of the current state.
    pub fn get_status(&self) -> RiskState {
        self.state.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
