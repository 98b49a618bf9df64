//! Shared types for the mintpipe pipeline.
//!
//! These types form the data model that flows through every stage.
//! They are designed to be stable so that chain, strategy, and engine
//! modules can depend on them without circular references. Every record
//! serializes to snake_case JSON with lowercase enum variants, which is
//! the wire format the HTTP API exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Supported blockchain networks. Closed set; used as the routing
/// discriminator across the scanner, safety, and execution stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Base,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Solana => write!(f, "solana"),
            Chain::Base => write!(f, "base"),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery events
// ---------------------------------------------------------------------------

/// Liquidity observed in the pool the token was first seen in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitialLiquidity {
    pub pair: String,
    pub reserve_token: f64,
    pub reserve_native: f64,
}

/// A freshly-minted token discovered by the scanner. Immutable after
/// emission; flows by value through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFound {
    pub chain: Chain,
    pub token_address: String,
    pub first_seen_ts: i64,
    pub creator_address: String,
    pub initial_liquidity: InitialLiquidity,
    pub tx_hash: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl fmt::Display for TokenFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (native reserve: {:.2}, creator: {})",
            self.chain,
            self.token_address,
            self.initial_liquidity.reserve_native,
            self.creator_address,
        )
    }
}

impl TokenFound {
    /// Helper to build a test token with sensible defaults.
    #[cfg(test)]
    pub fn sample(chain: Chain, address: &str) -> Self {
        TokenFound {
            chain,
            token_address: address.to_string(),
            first_seen_ts: 1_760_000_000,
            creator_address: format!("creator-of-{address}"),
            initial_liquidity: InitialLiquidity {
                pair: format!("{address}/NATIVE"),
                reserve_token: 20_000.0,
                reserve_native: 20_000.0,
            },
            tx_hash: format!("tx-{address}"),
            metadata: HashMap::new(),
        }
    }
}

/// Priority assigned by the pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A token annotated by the pre-filter. If `dropped` is set, no later
/// stage may run for this token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreFiltered {
    pub token: TokenFound,
    pub priority: Priority,
    pub dropped: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Safety
// ---------------------------------------------------------------------------

/// Owner-level controls detected on the token contract or mint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerControls {
    pub renounced: bool,
    pub has_blacklist: bool,
    pub max_tx_limit: f64,
    pub tax_fee: f64,
    pub has_transfer_hook: bool,
}

/// Outcome of a simulated sell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulatedSell {
    pub success: bool,
    pub slippage: f64,
    pub gas_used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-token honeypot and owner-control assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyReport {
    pub token_address: String,
    pub chain: Chain,
    pub can_buy: bool,
    pub can_sell: bool,
    /// 0.0 (clean) to 1.0 (certain honeypot).
    pub honeypot_score: f64,
    pub liquidity_locked: bool,
    pub owner_controls: OwnerControls,
    pub simulated_sell: SimulatedSell,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Off-chain metrics
// ---------------------------------------------------------------------------

/// Volume/social trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Velocity {
    Rising,
    Stable,
    Falling,
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Velocity::Rising => write!(f, "rising"),
            Velocity::Stable => write!(f, "stable"),
            Velocity::Falling => write!(f, "falling"),
        }
    }
}

/// Metrics gathered from exchanges and social sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffChainMetrics {
    pub token_address: String,
    pub volume_24h_cex: f64,
    pub volume_24h_dex: f64,
    pub price_cex: f64,
    pub price_dex: f64,
    pub market_cap: f64,
    /// Mention counts keyed by source ("twitter", "telegram", "reddit").
    #[serde(default)]
    pub social_mentions: HashMap<String, u64>,
    pub velocity: Velocity,
    pub evaluated_at: DateTime<Utc>,
}

impl OffChainMetrics {
    /// Sum of mentions across all social sources.
    pub fn total_mentions(&self) -> u64 {
        self.social_mentions.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Strategy decision
// ---------------------------------------------------------------------------

/// Confidence bucket for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Position-size multiplier applied to the single-position cap.
    pub fn position_multiplier(&self) -> f64 {
        match self {
            Confidence::High => 1.0,
            Confidence::Medium => 0.7,
            Confidence::Low => 0.4,
        }
    }

    /// Stop-loss distance. Wider for high confidence, tighter when unsure.
    pub fn stop_loss_pct(&self) -> f64 {
        match self {
            Confidence::High => 0.20,
            Confidence::Medium => 0.15,
            Confidence::Low => 0.10,
        }
    }

    /// Recommended holding period in minutes.
    pub fn time_horizon_minutes(&self) -> u32 {
        match self {
            Confidence::High => 60,
            Confidence::Medium => 30,
            Confidence::Low => 15,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// Action class emitted by the strategy evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    List,
    Buy,
    Monitor,
    Skip,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::List => write!(f, "list"),
            Action::Buy => write!(f, "buy"),
            Action::Monitor => write!(f, "monitor"),
            Action::Skip => write!(f, "skip"),
        }
    }
}

/// A fully computed trading decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub token_address: String,
    pub chain: Chain,
    /// 0.0–1.0. Zero always implies `action == Skip`.
    pub win_probability: f64,
    pub expected_roi: f64,
    pub expected_roi_std: f64,
    pub confidence: Confidence,
    pub action: Action,
    pub suggested_amount_usd: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub time_horizon_minutes: u32,
    #[serde(default)]
    pub rationale: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | win={:.0}% roi={:.0}%±{:.0}% | {} ${:.2} (sl={:.0}% tp={:.0}% {}m)",
            self.action,
            self.token_address,
            self.win_probability * 100.0,
            self.expected_roi * 100.0,
            self.expected_roi_std * 100.0,
            self.confidence,
            self.suggested_amount_usd,
            self.stop_loss_pct * 100.0,
            self.take_profit_pct * 100.0,
            self.time_horizon_minutes,
        )
    }
}

// ---------------------------------------------------------------------------
// Candidates & execution
// ---------------------------------------------------------------------------

/// Lifecycle status of a listed candidate. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
    Failed,
}

impl CandidateStatus {
    /// Whether a transition from `self` to `next` is allowed.
    /// A candidate never returns to `Pending`, and terminal states
    /// (`Rejected`, `Executed`, `Failed`) never change.
    pub fn can_progress_to(&self, next: CandidateStatus) -> bool {
        next != CandidateStatus::Pending
            && matches!(self, CandidateStatus::Pending | CandidateStatus::Approved)
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateStatus::Pending => write!(f, "pending"),
            CandidateStatus::Approved => write!(f, "approved"),
            CandidateStatus::Rejected => write!(f, "rejected"),
            CandidateStatus::Executed => write!(f, "executed"),
            CandidateStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A token that passed every evaluation stage and is eligible for (or
/// has undergone) execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub token: TokenFound,
    pub safety: SafetyReport,
    pub offchain: OffChainMetrics,
    pub decision: Decision,
    pub listed_at: DateTime<Utc>,
    pub status: CandidateStatus,
}

/// On-chain status of an execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Confirmed => write!(f, "confirmed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of an execution attempt (real or dry-run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub token_address: String,
    pub chain: Chain,
    pub tx_hash: String,
    pub status: ExecutionStatus,
    pub gas_used: u64,
    pub slippage_actual: f64,
    pub amount_usd: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Risk state
// ---------------------------------------------------------------------------

/// Risk-manager state: limits plus running exposure/loss accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub single_position_pct: f64,
    pub total_exposure_pct: f64,
    pub daily_loss_limit: f64,
    pub account_balance: f64,
    pub current_exposure: f64,
    pub daily_loss: f64,
    pub trading_halted: bool,
    pub last_reset_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Chain --

    #[test]
    fn test_chain_display() {
        assert_eq!(format!("{}", Chain::Solana), "solana");
        assert_eq!(format!("{}", Chain::Base), "base");
    }

    #[test]
    fn test_chain_serialization_roundtrip() {
        let json = serde_json::to_string(&Chain::Solana).unwrap();
        assert_eq!(json, "\"solana\"");
        let parsed: Chain = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Chain::Solana);
    }

    // -- TokenFound --

    #[test]
    fn test_token_found_serialization_roundtrip() {
        let mut token = TokenFound::sample(Chain::Base, "0xabc");
        token.metadata.insert("symbol".into(), "ABC".into());

        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains("\"chain\":\"base\""));
        assert!(json.contains("token_address"));
        assert!(json.contains("reserve_native"));

        let parsed: TokenFound = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.token_address, "0xabc");
        assert_eq!(parsed.metadata.get("symbol").unwrap(), "ABC");
    }

    #[test]
    fn test_token_found_metadata_defaults_empty() {
        let json = r#"{
            "chain": "solana",
            "token_address": "Mint111",
            "first_seen_ts": 1760000000,
            "creator_address": "Creator111",
            "initial_liquidity": {"pair": "p", "reserve_token": 1.0, "reserve_native": 2.0},
            "tx_hash": "sig"
        }"#;
        let parsed: TokenFound = serde_json::from_str(json).unwrap();
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_token_found_display() {
        let token = TokenFound::sample(Chain::Solana, "Mint111");
        let display = format!("{token}");
        assert!(display.contains("solana"));
        assert!(display.contains("Mint111"));
    }

    // -- Enums --

    #[test]
    fn test_priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn test_velocity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Velocity::Rising).unwrap(), "\"rising\"");
        let parsed: Velocity = serde_json::from_str("\"falling\"").unwrap();
        assert_eq!(parsed, Velocity::Falling);
    }

    #[test]
    fn test_action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&Action::Skip).unwrap(), "\"skip\"");
    }

    // -- Confidence helpers --

    #[test]
    fn test_confidence_position_multiplier() {
        assert!((Confidence::High.position_multiplier() - 1.0).abs() < 1e-10);
        assert!((Confidence::Medium.position_multiplier() - 0.7).abs() < 1e-10);
        assert!((Confidence::Low.position_multiplier() - 0.4).abs() < 1e-10);
    }

    #[test]
    fn test_confidence_stop_loss() {
        assert!((Confidence::High.stop_loss_pct() - 0.20).abs() < 1e-10);
        assert!((Confidence::Medium.stop_loss_pct() - 0.15).abs() < 1e-10);
        assert!((Confidence::Low.stop_loss_pct() - 0.10).abs() < 1e-10);
    }

    #[test]
    fn test_confidence_time_horizon() {
        assert_eq!(Confidence::High.time_horizon_minutes(), 60);
        assert_eq!(Confidence::Medium.time_horizon_minutes(), 30);
        assert_eq!(Confidence::Low.time_horizon_minutes(), 15);
    }

    // -- OffChainMetrics --

    #[test]
    fn test_total_mentions() {
        let mut metrics = OffChainMetrics {
            token_address: "t".into(),
            volume_24h_cex: 0.0,
            volume_24h_dex: 0.0,
            price_cex: 0.0,
            price_dex: 0.0,
            market_cap: 0.0,
            social_mentions: HashMap::new(),
            velocity: Velocity::Stable,
            evaluated_at: Utc::now(),
        };
        assert_eq!(metrics.total_mentions(), 0);

        metrics.social_mentions.insert("twitter".into(), 80);
        metrics.social_mentions.insert("reddit".into(), 20);
        assert_eq!(metrics.total_mentions(), 100);
    }

    // -- CandidateStatus transitions --

    #[test]
    fn test_status_progresses_from_pending() {
        for next in [
            CandidateStatus::Approved,
            CandidateStatus::Rejected,
            CandidateStatus::Executed,
            CandidateStatus::Failed,
        ] {
            assert!(CandidateStatus::Pending.can_progress_to(next));
        }
    }

    #[test]
    fn test_status_never_returns_to_pending() {
        for current in [
            CandidateStatus::Pending,
            CandidateStatus::Approved,
            CandidateStatus::Rejected,
            CandidateStatus::Executed,
            CandidateStatus::Failed,
        ] {
            assert!(!current.can_progress_to(CandidateStatus::Pending));
        }
    }

    #[test]
    fn test_terminal_statuses_are_frozen() {
        for current in [
            CandidateStatus::Rejected,
            CandidateStatus::Executed,
            CandidateStatus::Failed,
        ] {
            assert!(!current.can_progress_to(CandidateStatus::Executed));
            assert!(!current.can_progress_to(CandidateStatus::Failed));
        }
    }

    #[test]
    fn test_approved_can_reach_terminal() {
        assert!(CandidateStatus::Approved.can_progress_to(CandidateStatus::Executed));
        assert!(CandidateStatus::Approved.can_progress_to(CandidateStatus::Failed));
    }

    // -- ExecutionResult / RiskState serialization --

    #[test]
    fn test_execution_result_serialization() {
        let result = ExecutionResult {
            token_address: "0xabc".into(),
            chain: Chain::Base,
            tx_hash: "0xdeadbeef".into(),
            status: ExecutionStatus::Confirmed,
            gas_used: 150_000,
            slippage_actual: 0.02,
            amount_usd: 100.0,
            timestamp: Utc::now(),
            error: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"confirmed\""));
        assert!(json.contains("slippage_actual"));
        // `error: None` is omitted entirely
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_risk_state_serialization_roundtrip() {
        let state = RiskState {
            single_position_pct: 0.01,
            total_exposure_pct: 0.05,
            daily_loss_limit: 500.0,
            account_balance: 10_000.0,
            current_exposure: 0.0,
            daily_loss: 0.0,
            trading_halted: false,
            last_reset_time: Utc::now(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("trading_halted"));
        let parsed: RiskState = serde_json::from_str(&json).unwrap();
        assert!((parsed.daily_loss_limit - 500.0).abs() < 1e-10);
    }

    // -- Decision display --

    #[test]
    fn test_decision_display() {
        let decision = Decision {
            token_address: "Mint111".into(),
            chain: Chain::Solana,
            win_probability: 0.85,
            expected_roi: 0.30,
            expected_roi_std: 0.25,
            confidence: Confidence::High,
            action: Action::Buy,
            suggested_amount_usd: 100.0,
            stop_loss_pct: 0.20,
            take_profit_pct: 0.45,
            time_horizon_minutes: 60,
            rationale: vec!["can_trade".into()],
            evaluated_at: Utc::now(),
        };
        let display = format!("{decision}");
        assert!(display.contains("buy"));
        assert!(display.contains("Mint111"));
        assert!(display.contains("85"));
    }
}
