//! Social mention lookups.
//!
//! Twitter counts come from the recent-counts endpoint and need a
//! bearer token; without one the lookup reports zero. Reddit uses the
//! public search endpoint. Telegram has no public counting API, so that
//! source always reports zero until a group watcher feeds it.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const TWITTER_BASE_URL: &str = "https://api.twitter.com/2";
const REDDIT_BASE_URL: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct TweetCountsResponse {
    meta: Option<TweetCountsMeta>,
}

#[derive(Debug, Deserialize)]
struct TweetCountsMeta {
    total_tweet_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RedditSearchResponse {
    data: Option<RedditListing>,
}

#[derive(Debug, Deserialize)]
struct RedditListing {
    #[serde(default)]
    children: Vec<serde_json::Value>,
}

/// Mention counters across social sources.
pub struct SocialClient {
    client: reqwest::Client,
    twitter_base_url: String,
    reddit_base_url: String,
    twitter_bearer: Option<String>,
}

impl SocialClient {
    pub fn new(twitter_bearer: Option<String>) -> Self {
        Self::with_base_urls(TWITTER_BASE_URL, REDDIT_BASE_URL, twitter_bearer)
    }

    pub fn with_base_urls(
        twitter_base_url: impl Into<String>,
        reddit_base_url: impl Into<String>,
        twitter_bearer: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            twitter_base_url: twitter_base_url.into(),
            reddit_base_url: reddit_base_url.into(),
            twitter_bearer,
        }
    }

    /// Tweets mentioning `query` in the last 24h. Zero without a bearer
    /// token.
    pub async fn twitter_mentions(&self, query: &str) -> Result<u64> {
        let Some(bearer) = &self.twitter_bearer else {
            return Ok(0);
        };

        let url = format!(
            "{}/tweets/counts/recent?query={}",
            self.twitter_base_url, query,
        );
        debug!(%url, "fetching twitter mention count");

        let response = self
            .client
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .bearer_auth(bearer)
            .send()
            .await
            .context("twitter counts request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("twitter counts returned {}", response.status()));
        }

        let body: TweetCountsResponse = response
            .json()
            .await
            .context("failed to parse twitter counts response")?;

        Ok(body.meta.and_then(|m| m.total_tweet_count).unwrap_or(0))
    }

    /// Telegram group activity. Always zero; there is no public counting
    /// endpoint to poll.
    pub async fn telegram_activity(&self, _query: &str) -> Result<u64> {
        Ok(0)
    }

    /// Posts matching `query` on Reddit's public search (one page; the
    /// count saturates at the page size, which is plenty of signal).
    pub async fn reddit_mentions(&self, query: &str) -> Result<u64> {
        let url = format!(
            "{}/search.json?q={}&sort=new&t=day",
            self.reddit_base_url, query,
        );
        debug!(%url, "fetching reddit mentions");

        let response = self
            .client
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .header(reqwest::header::USER_AGENT, "mintpipe/0.1")
            .send()
            .await
            .context("reddit search request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("reddit search returned {}", response.status()));
        }

        let body: RedditSearchResponse = response
            .json()
            .await
            .context("failed to parse reddit search response")?;

        Ok(body.data.map(|d| d.children.len() as u64).unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
