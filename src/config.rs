//! Configuration loading from environment variables.
//!
//! Every knob has a default, so the pipeline starts with no environment
//! at all (in dry-run mode). Secrets and overrides come from the process
//! environment, optionally populated from a `.env` file by the caller.
//! Bad values are fatal at startup; the orchestrator refuses to run on a
//! config that fails validation.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::types::Chain;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// If true, the executor never touches a chain.
    pub dry_run: bool,
    /// If true, the strategy emits BUY instead of LIST for qualifying tokens.
    pub auto_execute: bool,

    // Chain settings
    pub solana_rpc_url: String,
    pub base_rpc_url: String,
    pub scan_interval_solana: Duration,
    pub scan_interval_base: Duration,
    /// Confirmations to wait for before treating an execution as final.
    pub confirmations_wait: u32,

    // Strategy thresholds
    pub win_probability_threshold: f64,
    pub min_volume_dex: f64,
    pub min_liquidity: f64,
    pub max_honeypot_score: f64,
    pub max_slippage: f64,

    // Risk management
    pub single_position_pct: f64,
    pub total_exposure_pct: f64,
    pub daily_loss_limit: f64,
    pub account_balance: f64,

    // Observability API
    pub api_port: u16,

    // External data keys (lookups degrade to zero without them)
    pub okx_api_key: Option<String>,
    pub twitter_api_key: Option<String>,

    // Allow/deny lists (comma-separated in the environment)
    pub blacklisted_tokens: Vec<String>,
    pub blacklisted_creators: Vec<String>,
    pub whitelisted_tokens: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: true,
            auto_execute: false,
            solana_rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            base_rpc_url: "https://mainnet.base.org".to_string(),
            scan_interval_solana: Duration::from_secs(2),
            scan_interval_base: Duration::from_secs(2),
            confirmations_wait: 2,
            win_probability_threshold: 0.80,
            min_volume_dex: 10_000.0,
            min_liquidity: 5_000.0,
            max_honeypot_score: 0.20,
            max_slippage: 0.05,
            single_position_pct: 0.01,
            total_exposure_pct: 0.05,
            daily_loss_limit: 500.0,
            account_balance: 10_000.0,
            api_port: 8080,
            okx_api_key: None,
            twitter_api_key: None,
            blacklisted_tokens: Vec::new(),
            blacklisted_creators: Vec::new(),
            whitelisted_tokens: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults,
    /// and validate it. Call `dotenv::dotenv()` first if a `.env` file
    /// should be honoured.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            dry_run: parse_bool(env_var("DRY_RUN"), defaults.dry_run),
            auto_execute: parse_bool(env_var("AUTO_EXECUTE"), defaults.auto_execute),
            solana_rpc_url: env_var("SOLANA_RPC_URL").unwrap_or(defaults.solana_rpc_url),
            base_rpc_url: env_var("BASE_RPC_URL").unwrap_or(defaults.base_rpc_url),
            scan_interval_solana: Duration::from_secs(parse_u64(
                env_var("SCAN_INTERVAL_SOLANA_SEC"),
                defaults.scan_interval_solana.as_secs(),
            )),
            scan_interval_base: Duration::from_secs(parse_u64(
                env_var("SCAN_INTERVAL_BASE_SEC"),
                defaults.scan_interval_base.as_secs(),
            )),
            confirmations_wait: parse_u64(
                env_var("CONFIRMATIONS_WAIT"),
                defaults.confirmations_wait as u64,
            ) as u32,
            win_probability_threshold: parse_f64(
                env_var("WIN_PROBABILITY_THRESHOLD"),
                defaults.win_probability_threshold,
            ),
            min_volume_dex: parse_f64(env_var("MIN_VOLUME_DEX"), defaults.min_volume_dex),
            min_liquidity: parse_f64(env_var("MIN_LIQUIDITY"), defaults.min_liquidity),
            max_honeypot_score: parse_f64(
                env_var("MAX_HONEYPOT_SCORE"),
                defaults.max_honeypot_score,
            ),
            max_slippage: parse_f64(env_var("MAX_SLIPPAGE"), defaults.max_slippage),
            single_position_pct: parse_f64(
                env_var("SINGLE_POSITION_PCT"),
                defaults.single_position_pct,
            ),
            total_exposure_pct: parse_f64(
                env_var("TOTAL_EXPOSURE_PCT"),
                defaults.total_exposure_pct,
            ),
            daily_loss_limit: parse_f64(env_var("DAILY_LOSS_LIMIT"), defaults.daily_loss_limit),
            account_balance: parse_f64(env_var("ACCOUNT_BALANCE"), defaults.account_balance),
            api_port: parse_u64(env_var("API_PORT"), defaults.api_port as u64) as u16,
            okx_api_key: env_var("OKX_API_KEY"),
            twitter_api_key: env_var("TWITTER_API_KEY"),
            blacklisted_tokens: parse_list(env_var("BLACKLISTED_TOKENS")),
            blacklisted_creators: parse_list(env_var("BLACKLISTED_CREATORS")),
            whitelisted_tokens: parse_list(env_var("WHITELISTED_TOKENS")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Structural validation. Violations are fatal to the process.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("WIN_PROBABILITY_THRESHOLD", self.win_probability_threshold),
            ("MAX_HONEYPOT_SCORE", self.max_honeypot_score),
            ("MAX_SLIPPAGE", self.max_slippage),
            ("SINGLE_POSITION_PCT", self.single_position_pct),
            ("TOTAL_EXPOSURE_PCT", self.total_exposure_pct),
        ] {
            if !(0.0..=1.0).contains(&value) || value <= 0.0 {
                bail!("{name} must lie in (0, 1], got {value}");
            }
        }
        if self.account_balance <= 0.0 {
            bail!("ACCOUNT_BALANCE must be positive, got {}", self.account_balance);
        }
        if self.daily_loss_limit <= 0.0 {
            bail!("DAILY_LOSS_LIMIT must be positive, got {}", self.daily_loss_limit);
        }
        if self.scan_interval_solana.is_zero() || self.scan_interval_base.is_zero() {
            bail!("scan intervals must be non-zero");
        }
        if self.min_liquidity < 0.0 || self.min_volume_dex < 0.0 {
            bail!("MIN_LIQUIDITY and MIN_VOLUME_DEX must be non-negative");
        }
        Ok(())
    }

    /// Scan interval for a chain.
    pub fn scan_interval(&self, chain: Chain) -> Duration {
        match chain {
            Chain::Solana => self.scan_interval_solana,
            Chain::Base => self.scan_interval_base,
        }
    }

    /// RPC endpoint for a chain.
    pub fn rpc_url(&self, chain: Chain) -> &str {
        match chain {
            Chain::Solana => &self.solana_rpc_url,
            Chain::Base => &self.base_rpc_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse helpers
// ---------------------------------------------------------------------------

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_f64(raw: Option<String>, default: f64) -> f64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
