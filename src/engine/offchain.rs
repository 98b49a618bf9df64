//! Off-chain gatherer — per-token fan-out of external metric lookups.
//!
//! Eight lookups (DEX/CEX volume and price, market cap, three social
//! sources) run concurrently; each failure degrades to a zero
//! observation so one flaky provider never sinks the token. Velocity is
//! derived last from the combined volume and social picture.

use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::data::{CexClient, DexClient, SocialClient};
use crate::types::{OffChainMetrics, PreFiltered, Velocity};

pub struct OffChainGatherer {
    config: Arc<Config>,
    dex: DexClient,
    cex: CexClient,
    social: SocialClient,
}

impl OffChainGatherer {
    pub fn new(config: Arc<Config>) -> Self {
        let cex = CexClient::new(config.okx_api_key.clone());
        let social = SocialClient::new(config.twitter_api_key.clone());
        Self {
            config,
            dex: DexClient::new(),
            cex,
            social,
        }
    }

    /// Build a gatherer over specific clients (tests point these at
    /// unreachable endpoints to exercise the degradation path).
    pub fn with_clients(
        config: Arc<Config>,
        dex: DexClient,
        cex: CexClient,
        social: SocialClient,
    ) -> Self {
        Self {
            config,
            dex,
            cex,
            social,
        }
    }

    /// Gather metrics for a token. Individual lookups may fail; the
    /// gather itself only fails on cancellation.
    pub async fn gather(&self, token: &PreFiltered) -> Result<OffChainMetrics> {
        let address = token.token.token_address.as_str();
        // CEX and social lookups key on the ticker symbol when the
        // launch metadata carries one; otherwise the address has to do.
        let symbol = token
            .token
            .metadata
            .get("symbol")
            .map(String::as_str)
            .unwrap_or(address);

        debug!(token = %address, symbol, "gathering off-chain metrics");

        let (vol_dex, vol_cex, price_dex, price_cex, market_cap, twitter, telegram, reddit) = tokio::join!(
            self.dex.volume_24h(address),
            self.cex.volume_24h(symbol),
            self.dex.price(address),
            self.cex.price(symbol),
            self.dex.market_cap(address),
            self.social.twitter_mentions(symbol),
            self.social.telegram_activity(symbol),
            self.social.reddit_mentions(symbol),
        );

        let mut social_mentions = HashMap::new();
        social_mentions.insert("twitter".to_string(), zero_on_error("twitter", twitter));
        social_mentions.insert("telegram".to_string(), zero_on_error("telegram", telegram));
        social_mentions.insert("reddit".to_string(), zero_on_error("reddit", reddit));

        let mut metrics = OffChainMetrics {
            token_address: address.to_string(),
            volume_24h_dex: zero_on_error("dex_volume", vol_dex),
            volume_24h_cex: zero_on_error("cex_volume", vol_cex),
            price_dex: zero_on_error("dex_price", price_dex),
            price_cex: zero_on_error("cex_price", price_cex),
            market_cap: zero_on_error("market_cap", market_cap),
            social_mentions,
            velocity: Velocity::Falling,
            evaluated_at: Utc::now(),
        };
        metrics.velocity = derive_velocity(&metrics, self.config.min_volume_dex);

        debug!(
            token = %address,
            dex_volume = metrics.volume_24h_dex,
            cex_volume = metrics.volume_24h_cex,
            mentions = metrics.total_mentions(),
            velocity = %metrics.velocity,
            "off-chain metrics gathered"
        );

        Ok(metrics)
    }
}

fn zero_on_error<T: Default>(source: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|error| {
        warn!(source, %error, "off-chain lookup failed, recording zero");
        T::default()
    })
}

/// Classify momentum from combined volume and social activity.
pub fn derive_velocity(metrics: &OffChainMetrics, min_volume_dex: f64) -> Velocity {
    let total_volume = metrics.volume_24h_dex + metrics.volume_24h_cex;
    let social_score = metrics.total_mentions();

    if total_volume > min_volume_dex * 2.0 || social_score > 100 {
        Velocity::Rising
    } else if total_volume > min_volume_dex / 2.0 {
        Velocity::Stable
    } else {
        Velocity::Falling
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
