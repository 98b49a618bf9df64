//! Off-chain data providers.
//!
//! Thin HTTP clients behind the off-chain gatherer: DEX aggregator data
//! (volume, price, market cap), CEX ticker data, and social mention
//! counts. Every client degrades gracefully — the gatherer treats any
//! lookup failure as a zero observation, never a pipeline error.

pub mod market;
pub mod social;

pub use market::{CexClient, DexClient};
pub use social::SocialClient;
