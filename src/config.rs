//! Configuration loaded from the environment.
//!
//! Everything is optional: without an API key the primary source runs on
//! its free tier (daily candles only; intraday intervals answer 402
//! upstream, surfaced as a payment-required error).

use crate::infrastructure::{coinpaprika, geckoterminal};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// CoinPaprika API key. Absent means free tier.
    pub coinpaprika_api_key: Option<String>,
    pub coinpaprika_base_url: String,
    pub geckoterminal_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            coinpaprika_api_key: env::var("COINPAPRIKA_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            coinpaprika_base_url: env::var("COINPAPRIKA_BASE_URL")
                .unwrap_or_else(|_| coinpaprika::DEFAULT_BASE_URL.to_string()),
            geckoterminal_base_url: env::var("GECKOTERMINAL_BASE_URL")
                .unwrap_or_else(|_| geckoterminal::DEFAULT_BASE_URL.to_string()),
        }
    }
}
