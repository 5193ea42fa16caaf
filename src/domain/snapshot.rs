use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point-in-time quote for one asset.
///
/// Fields the serving upstream does not supply stay `None`; the DEX
/// fallback source, for instance, has no market-cap rank or ATH data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub name: Option<String>,
    pub price: f64,
    /// Absolute 24h change in quote currency.
    pub change_24h: Option<f64>,
    /// Relative 24h change in percent.
    pub change_24h_pct: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub rank: Option<u32>,
    /// Percent change keyed by interval label ("15m", "1h", "7d", ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub percent_changes: BTreeMap<String, f64>,
    pub ath_price: Option<f64>,
    pub ath_date: Option<String>,
    /// When this snapshot was fetched (unix seconds).
    pub fetched_at: i64,
}

impl PriceSnapshot {
    pub fn new(symbol: impl Into<String>, price: f64, fetched_at: i64) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            price,
            change_24h: None,
            change_24h_pct: None,
            volume_24h: None,
            market_cap: None,
            rank: None,
            percent_changes: BTreeMap::new(),
            ath_price: None,
            ath_date: None,
            fetched_at,
        }
    }
}
