//! CoinPaprika client: the primary quote source.
//!
//! Well-known tickers resolve through a static map; anything else goes
//! through the search endpoint. Historical OHLCV is served per interval,
//! with intraday intervals gated to paid tiers upstream (402).

use crate::domain::candle::Candle;
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::snapshot::PriceSnapshot;
use crate::domain::timeframe::Timeframe;
use crate::infrastructure::core::http::{build_http_client, url_with_query};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.coinpaprika.com/v1";

/// Upstream ids for the majors, so the common path skips a search call.
const KNOWN_IDS: &[(&str, &str)] = &[
    ("BTC", "btc-bitcoin"),
    ("ETH", "eth-ethereum"),
    ("USDT", "usdt-tether"),
    ("BNB", "bnb-binance-coin"),
    ("SOL", "sol-solana"),
    ("XRP", "xrp-xrp"),
    ("USDC", "usdc-usd-coin"),
    ("ADA", "ada-cardano"),
    ("DOGE", "doge-dogecoin"),
    ("TRX", "trx-tron"),
    ("AVAX", "avax-avalanche"),
    ("DOT", "dot-polkadot"),
    ("LINK", "link-chainlink"),
    ("MATIC", "matic-polygon"),
    ("TON", "toncoin-the-open-network"),
    ("SHIB", "shib-shiba-inu"),
    ("LTC", "ltc-litecoin"),
    ("BCH", "bch-bitcoin-cash"),
    ("UNI", "uni-uniswap"),
    ("ATOM", "atom-cosmos"),
    ("XLM", "xlm-stellar"),
    ("ETC", "etc-ethereum-classic"),
    ("XMR", "xmr-monero"),
    ("FIL", "fil-filecoin"),
    ("NEAR", "near-near-protocol"),
    ("APT", "apt-aptos"),
    ("ARB", "arb-arbitrum"),
    ("OP", "op-optimism"),
    ("AAVE", "aave-new"),
    ("ALGO", "algo-algorand"),
];

pub struct CoinPaprikaClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl CoinPaprikaClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn get(&self, url: &str) -> reqwest_middleware::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key);
        }
        request
    }

    /// Resolve a ticker symbol to a CoinPaprika coin id.
    pub async fn resolve_symbol(&self, symbol: &str) -> AnalysisResult<String> {
        let upper = symbol.to_uppercase();
        if let Some((_, id)) = KNOWN_IDS.iter().find(|(sym, _)| *sym == upper) {
            return Ok((*id).to_string());
        }

        debug!(symbol = %upper, "resolving via search");
        let url = url_with_query(
            &format!("{}/search", self.base_url),
            &[("q", upper.as_str()), ("c", "currencies"), ("limit", "10")],
        );

        let response = self.get(&url).send().await.map_err(to_network_error)?;
        let response = check_status(response).await?;

        #[derive(Debug, Deserialize)]
        struct SearchResult {
            #[serde(default)]
            currencies: Vec<SearchCurrency>,
        }

        #[derive(Debug, Deserialize)]
        struct SearchCurrency {
            id: String,
            symbol: String,
        }

        let result: SearchResult = response
            .json()
            .await
            .map_err(|e| AnalysisError::DataParsing(format!("search response: {}", e)))?;

        let matched = result
            .currencies
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(&upper))
            .or_else(|| result.currencies.first());

        match matched {
            Some(c) => Ok(c.id.clone()),
            None => Err(AnalysisError::InvalidSymbol(upper)),
        }
    }

    /// Current ticker with the full percent-change interval set.
    pub async fn fetch_ticker(&self, id: &str) -> AnalysisResult<PriceSnapshot> {
        let url = url_with_query(
            &format!("{}/tickers/{}", self.base_url, id),
            &[("quotes", "USD")],
        );

        let response = self.get(&url).send().await.map_err(to_network_error)?;
        let response = check_status(response).await?;

        let ticker: TickerPayload = response
            .json()
            .await
            .map_err(|e| AnalysisError::DataParsing(format!("ticker response: {}", e)))?;

        let usd = ticker
            .quotes
            .get("USD")
            .ok_or_else(|| AnalysisError::DataParsing("ticker has no USD quote".to_string()))?;

        let mut percent_changes = BTreeMap::new();
        let intervals = [
            ("15m", usd.percent_change_15m),
            ("30m", usd.percent_change_30m),
            ("1h", usd.percent_change_1h),
            ("6h", usd.percent_change_6h),
            ("12h", usd.percent_change_12h),
            ("24h", usd.percent_change_24h),
            ("7d", usd.percent_change_7d),
            ("30d", usd.percent_change_30d),
            ("1y", usd.percent_change_1y),
        ];
        for (label, value) in intervals {
            if let Some(v) = value {
                percent_changes.insert(label.to_string(), v);
            }
        }

        // Back out the absolute move from the relative one
        let change_24h = usd
            .percent_change_24h
            .map(|pct| usd.price - usd.price / (1.0 + pct / 100.0));

        Ok(PriceSnapshot {
            symbol: ticker.symbol,
            name: Some(ticker.name),
            price: usd.price,
            change_24h,
            change_24h_pct: usd.percent_change_24h,
            volume_24h: usd.volume_24h,
            market_cap: usd.market_cap,
            rank: ticker.rank,
            percent_changes,
            ath_price: usd.ath_price,
            ath_date: usd.ath_date.clone(),
            fetched_at: Utc::now().timestamp(),
        })
    }

    /// Historical OHLCV for the most recent `periods` buckets of the
    /// given timeframe.
    pub async fn fetch_ohlcv(
        &self,
        id: &str,
        timeframe: Timeframe,
        periods: usize,
    ) -> AnalysisResult<Vec<Candle>> {
        let span = ChronoDuration::minutes(timeframe.minutes() as i64 * periods as i64);
        let start = (Utc::now() - span).format("%Y-%m-%d").to_string();
        let limit = periods.to_string();

        let url = url_with_query(
            &format!("{}/coins/{}/ohlcv/historical", self.base_url, id),
            &[
                ("start", start.as_str()),
                ("interval", timeframe.to_paprika_interval()),
                ("limit", limit.as_str()),
            ],
        );

        let response = self.get(&url).send().await.map_err(to_network_error)?;
        if response.status().as_u16() == 402 {
            return Err(AnalysisError::payment_required_for(
                timeframe.to_paprika_interval(),
            ));
        }
        let response = check_status(response).await?;

        let rows: Vec<OhlcvRow> = response
            .json()
            .await
            .map_err(|e| AnalysisError::DataParsing(format!("ohlcv response: {}", e)))?;

        let mut candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                let ts = DateTime::parse_from_rfc3339(&row.time_open).ok()?;
                Some(Candle::new(
                    ts.timestamp(),
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.volume.unwrap_or(0.0),
                ))
            })
            .collect();
        candles.sort_by_key(|c| c.timestamp);

        info!(id, count = candles.len(), "fetched ohlcv history");
        Ok(candles)
    }
}

#[derive(Debug, Deserialize)]
struct TickerPayload {
    symbol: String,
    name: String,
    rank: Option<u32>,
    quotes: BTreeMap<String, UsdQuote>,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    price: f64,
    volume_24h: Option<f64>,
    market_cap: Option<f64>,
    percent_change_15m: Option<f64>,
    percent_change_30m: Option<f64>,
    percent_change_1h: Option<f64>,
    percent_change_6h: Option<f64>,
    percent_change_12h: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_7d: Option<f64>,
    percent_change_30d: Option<f64>,
    percent_change_1y: Option<f64>,
    ath_price: Option<f64>,
    ath_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OhlcvRow {
    time_open: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
}

fn to_network_error(e: reqwest_middleware::Error) -> AnalysisError {
    AnalysisError::Network(e.to_string())
}

/// Map upstream status codes onto domain errors. 402 is handled by the
/// OHLCV path before this runs so the message can name the interval.
async fn check_status(response: reqwest::Response) -> AnalysisResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(match code {
        402 => AnalysisError::PaymentRequired(
            "this endpoint requires a paid API tier".to_string(),
        ),
        404 => AnalysisError::InvalidSymbol(body),
        429 => AnalysisError::RateLimit(body),
        _ => AnalysisError::Network(format!("HTTP {}: {}", code, body)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_cover_majors() {
        let find = |sym: &str| KNOWN_IDS.iter().find(|(s, _)| *s == sym).map(|(_, id)| *id);
        assert_eq!(find("BTC"), Some("btc-bitcoin"));
        assert_eq!(find("ETH"), Some("eth-ethereum"));
        assert_eq!(find("XYZ"), None);
    }

    #[test]
    fn test_change_24h_derivation() {
        // price 110 after a +10% day: previous price 100, change 10
        let price: f64 = 110.0;
        let pct: f64 = 10.0;
        let change = price - price / (1.0 + pct / 100.0);
        assert!((change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_ticker_payload_parsing() {
        let raw = r#"{
            "id": "btc-bitcoin",
            "symbol": "BTC",
            "name": "Bitcoin",
            "rank": 1,
            "quotes": {
                "USD": {
                    "price": 64230.5,
                    "volume_24h": 24100000000.0,
                    "market_cap": 1270000000000.0,
                    "percent_change_24h": -1.2,
                    "percent_change_7d": 3.4,
                    "ath_price": 73750.0,
                    "ath_date": "2024-03-14T07:10:36Z"
                }
            }
        }"#;
        let ticker: TickerPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(ticker.symbol, "BTC");
        assert_eq!(ticker.rank, Some(1));
        let usd = &ticker.quotes["USD"];
        assert_eq!(usd.price, 64230.5);
        assert_eq!(usd.percent_change_24h, Some(-1.2));
        assert!(usd.percent_change_15m.is_none());
    }

    #[test]
    fn test_ohlcv_row_parsing() {
        let raw = r#"[{
            "time_open": "2024-06-01T00:00:00Z",
            "time_close": "2024-06-01T23:59:59Z",
            "open": 100.0,
            "high": 110.0,
            "low": 95.0,
            "close": 105.0,
            "volume": 12345.0,
            "market_cap": 1.0
        }]"#;
        let rows: Vec<OhlcvRow> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].open, 100.0);
        assert_eq!(rows[0].volume, Some(12345.0));
    }
}
