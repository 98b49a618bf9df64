//! Pre-filter — cheap synchronous classification of discovered tokens.
//!
//! Applies allow/deny lists and a handful of heuristics before any RPC
//! or HTTP work is spent on a token. Deny rules short-circuit; the
//! remaining rules accumulate reason tags, and the priority of the last
//! rule that fires wins (high initial liquidity upgrades a token that
//! an earlier rule flagged low).

use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::types::{PreFiltered, Priority, TokenFound};

/// Metadata substrings that mark a token suspicious (matched
/// case-insensitively against every key and value).
const SUSPICIOUS_METADATA_TERMS: &[&str] = &[
    "test", "scam", "rug", "fake", "honeypot", "xxx", "pump", "dump", "bot",
];

/// Native reserve above which a launch is treated as whale-backed.
const HIGH_LIQUIDITY_THRESHOLD: f64 = 100_000.0;

pub struct PreFilter {
    config: Arc<Config>,
}

impl PreFilter {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Classify a token. Pure; evaluation order matters and is part of
    /// the contract.
    pub fn filter(&self, token: TokenFound) -> PreFiltered {
        let mut result = PreFiltered {
            priority: Priority::Medium,
            dropped: false,
            reasons: Vec::new(),
            token,
        };

        if contains_ignore_case(&self.config.blacklisted_tokens, &result.token.token_address) {
            result.dropped = true;
            result.reasons.push("token_blacklisted".to_string());
            debug!(token = %result.token.token_address, "dropped: blacklisted token");
            return result;
        }

        if contains_ignore_case(&self.config.blacklisted_creators, &result.token.creator_address) {
            result.dropped = true;
            result.reasons.push("creator_blacklisted".to_string());
            debug!(token = %result.token.token_address, "dropped: blacklisted creator");
            return result;
        }

        if contains_ignore_case(&self.config.whitelisted_tokens, &result.token.token_address) {
            result.priority = Priority::High;
            result.reasons.push("token_whitelisted".to_string());
            debug!(token = %result.token.token_address, "high priority: whitelisted");
            return result;
        }

        let native_reserve = result.token.initial_liquidity.reserve_native;

        if native_reserve < self.config.min_liquidity {
            result.priority = Priority::Low;
            result.reasons.push("low_initial_liquidity".to_string());
            debug!(
                token = %result.token.token_address,
                reserve = native_reserve,
                "low priority: thin initial liquidity"
            );
        }

        if has_suspicious_metadata(&result.token) {
            result.priority = Priority::Low;
            result.reasons.push("suspicious_metadata".to_string());
            debug!(token = %result.token.token_address, "low priority: suspicious metadata");
        }

        if native_reserve > HIGH_LIQUIDITY_THRESHOLD {
            result.priority = Priority::High;
            result.reasons.push("high_initial_liquidity".to_string());
            debug!(
                token = %result.token.token_address,
                reserve = native_reserve,
                "high priority: whale-sized initial liquidity"
            );
        }

        result
    }
}

fn contains_ignore_case(list: &[String], address: &str) -> bool {
    list.iter().any(|entry| entry.eq_ignore_ascii_case(address))
}

fn has_suspicious_metadata(token: &TokenFound) -> bool {
    token.metadata.iter().any(|(key, value)| {
        let key = key.to_lowercase();
        let value = value.to_lowercase();
        SUSPICIOUS_METADATA_TERMS
            .iter()
            .any(|term| key.contains(term) || value.contains(term))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
