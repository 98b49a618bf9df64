//! Market data clients: DEX aggregator and CEX ticker lookups.
//!
//! The DEX side uses the DexScreener public API (no key required);
//! pairs are ranked by liquidity and the best pair's figures are taken
//! as the token's DEX volume/price/market cap. The CEX side queries the
//! OKX public ticker by symbol; tokens this fresh are rarely listed, so
//! a missing instrument is a normal zero, not an error.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com/latest/dex";
const OKX_BASE_URL: &str = "https://www.okx.com/api/v5";

// ---------------------------------------------------------------------------
// DEX aggregator
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

/// One trading pair as reported by the aggregator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    pub chain_id: String,
    pub dex_id: String,
    pub price_usd: Option<String>,
    pub volume: Option<PairVolume>,
    pub liquidity: Option<PairLiquidity>,
    /// Fully-diluted valuation; used as the market-cap figure.
    pub fdv: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairVolume {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairLiquidity {
    pub usd: Option<f64>,
}

/// Pick the most liquid pair; the rest are usually dust pools.
fn best_pair(pairs: Vec<DexPair>) -> Option<DexPair> {
    pairs.into_iter().max_by(|a, b| {
        let liq_a = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
        let liq_b = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
        liq_a.partial_cmp(&liq_b).unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// DexScreener-backed DEX data client.
pub struct DexClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for DexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DexClient {
    pub fn new() -> Self {
        Self::with_base_url(DEXSCREENER_BASE_URL)
    }

    /// Point the client at a different endpoint (tests use this).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn best_pair_for(&self, token_address: &str) -> Result<DexPair> {
        let url = format!("{}/tokens/{}", self.base_url, token_address);
        debug!(%url, "fetching dex pairs");

        let response = self
            .client
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .context("dex pairs request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("dex pairs request returned {}", response.status()));
        }

        let body: PairsResponse = response
            .json()
            .await
            .context("failed to parse dex pairs response")?;

        best_pair(body.pairs.unwrap_or_default())
            .ok_or_else(|| anyhow!("no pairs listed for {token_address}"))
    }

    /// 24h trading volume on the token's most liquid pair, in USD.
    pub async fn volume_24h(&self, token_address: &str) -> Result<f64> {
        let pair = self.best_pair_for(token_address).await?;
        Ok(pair.volume.and_then(|v| v.h24).unwrap_or(0.0))
    }

    /// Spot price on the most liquid pair, in USD.
    pub async fn price(&self, token_address: &str) -> Result<f64> {
        let pair = self.best_pair_for(token_address).await?;
        Ok(pair
            .price_usd
            .and_then(|p| p.parse().ok())
            .unwrap_or(0.0))
    }

    /// Market cap (FDV) of the token, in USD.
    pub async fn market_cap(&self, token_address: &str) -> Result<f64> {
        let pair = self.best_pair_for(token_address).await?;
        Ok(pair.fdv.unwrap_or(0.0))
    }
}

// ---------------------------------------------------------------------------
// CEX ticker
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TickerResponse {
    code: String,
    #[serde(default)]
    data: Vec<Ticker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    /// Last traded price, as a decimal string.
    pub last: Option<String>,
    /// 24h volume in quote currency, as a decimal string.
    #[serde(rename = "volCcy24h")]
    pub vol_ccy_24h: Option<String>,
}

/// OKX public-ticker client. The public market endpoints need no key;
/// the key field is kept for the authenticated endpoints that a real
/// deployment adds later.
pub struct CexClient {
    client: reqwest::Client,
    base_url: String,
    #[allow(dead_code)]
    api_key: Option<String>,
}

impl CexClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(OKX_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn ticker(&self, symbol: &str) -> Result<Option<Ticker>> {
        let inst_id = format!("{}-USDT", symbol.to_uppercase());
        let url = format!("{}/market/ticker?instId={}", self.base_url, inst_id);
        debug!(%url, "fetching cex ticker");

        let response = self
            .client
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .context("cex ticker request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("cex ticker request returned {}", response.status()));
        }

        let body: TickerResponse = response
            .json()
            .await
            .context("failed to parse cex ticker response")?;

        // A non-zero code means the instrument isn't listed — normal for
        // tokens minutes old.
        if body.code != "0" {
            return Ok(None);
        }
        Ok(body.data.into_iter().next())
    }

    /// 24h volume for `symbol` against USDT, zero when unlisted.
    pub async fn volume_24h(&self, symbol: &str) -> Result<f64> {
        Ok(self
            .ticker(symbol)
            .await?
            .and_then(|t| t.vol_ccy_24h)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0))
    }

    /// Last traded price for `symbol` against USDT, zero when unlisted.
    pub async fn price(&self, symbol: &str) -> Result<f64> {
        Ok(self
            .ticker(symbol)
            .await?
            .and_then(|t| t.last)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
