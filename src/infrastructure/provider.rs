//! The composed market-data provider.
//!
//! Two upstreams sit behind the [`QuoteSource`] capability trait; the
//! provider owns the fallback order (CoinPaprika first, GeckoTerminal
//! second) and the three caches. Historical candles are a primary-only
//! concern; snapshots fall back.

use crate::domain::candle::Candle;
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::snapshot::PriceSnapshot;
use crate::domain::timeframe::Timeframe;
use crate::infrastructure::coinpaprika::CoinPaprikaClient;
use crate::infrastructure::core::cache::TtlCache;
use crate::infrastructure::geckoterminal::GeckoTerminalClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const SNAPSHOT_TTL: Duration = Duration::from_secs(60);
const CANDLE_TTL: Duration = Duration::from_secs(300);

/// What any upstream must offer to serve as a quote source.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Map a ticker symbol to this source's identifier.
    async fn resolve(&self, symbol: &str) -> AnalysisResult<String>;

    async fn fetch_ticker(&self, id: &str) -> AnalysisResult<PriceSnapshot>;

    async fn fetch_ohlcv(
        &self,
        id: &str,
        timeframe: Timeframe,
        periods: usize,
    ) -> AnalysisResult<Vec<Candle>>;
}

#[async_trait]
impl QuoteSource for CoinPaprikaClient {
    fn name(&self) -> &'static str {
        "coinpaprika"
    }

    async fn resolve(&self, symbol: &str) -> AnalysisResult<String> {
        self.resolve_symbol(symbol).await
    }

    async fn fetch_ticker(&self, id: &str) -> AnalysisResult<PriceSnapshot> {
        CoinPaprikaClient::fetch_ticker(self, id).await
    }

    async fn fetch_ohlcv(
        &self,
        id: &str,
        timeframe: Timeframe,
        periods: usize,
    ) -> AnalysisResult<Vec<Candle>> {
        CoinPaprikaClient::fetch_ohlcv(self, id, timeframe, periods).await
    }
}

#[async_trait]
impl QuoteSource for GeckoTerminalClient {
    fn name(&self) -> &'static str {
        "geckoterminal"
    }

    /// The DEX side searches by symbol directly; the symbol is the id.
    async fn resolve(&self, symbol: &str) -> AnalysisResult<String> {
        Ok(symbol.to_uppercase())
    }

    async fn fetch_ticker(&self, id: &str) -> AnalysisResult<PriceSnapshot> {
        self.snapshot_for_symbol(id).await
    }

    async fn fetch_ohlcv(
        &self,
        _id: &str,
        _timeframe: Timeframe,
        _periods: usize,
    ) -> AnalysisResult<Vec<Candle>> {
        Err(AnalysisError::NotSupported(
            "historical candles are served by the primary source".to_string(),
        ))
    }
}

pub struct MarketDataProvider {
    primary: Arc<dyn QuoteSource>,
    secondary: Arc<dyn QuoteSource>,
    /// symbol -> primary-source id. Symbols are stable, so no TTL.
    id_cache: RwLock<HashMap<String, String>>,
    snapshot_cache: TtlCache<String, PriceSnapshot>,
    candle_cache: TtlCache<(String, Timeframe, usize), Vec<Candle>>,
}

impl MarketDataProvider {
    pub fn new(primary: Arc<dyn QuoteSource>, secondary: Arc<dyn QuoteSource>) -> Self {
        Self {
            primary,
            secondary,
            id_cache: RwLock::new(HashMap::new()),
            snapshot_cache: TtlCache::new(SNAPSHOT_TTL),
            candle_cache: TtlCache::new(CANDLE_TTL),
        }
    }

    /// Current snapshot, cached for a minute. The secondary source covers
    /// for the primary on everything except upstream rate limiting.
    pub async fn snapshot(&self, symbol: &str) -> AnalysisResult<PriceSnapshot> {
        let key = symbol.to_uppercase();
        self.snapshot_cache
            .get_or_fetch(key.clone(), || self.fetch_snapshot(key.clone()))
            .await
    }

    async fn fetch_snapshot(&self, symbol: String) -> AnalysisResult<PriceSnapshot> {
        let primary_err = match self.resolve_id(&symbol).await {
            Ok(id) => match self.primary.fetch_ticker(&id).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => e,
            },
            Err(e) => e,
        };

        if matches!(primary_err, AnalysisError::RateLimit(_)) {
            return Err(primary_err);
        }

        warn!(
            symbol = %symbol,
            error = %primary_err,
            fallback = self.secondary.name(),
            "primary source failed, trying secondary"
        );

        match self.secondary.resolve(&symbol).await {
            Ok(id) => match self.secondary.fetch_ticker(&id).await {
                Ok(snapshot) => Ok(snapshot),
                Err(_) => Err(primary_err),
            },
            Err(_) => Err(primary_err),
        }
    }

    /// Historical window, cached for five minutes. Primary only: the DEX
    /// side cannot substitute for exchange-grade OHLCV.
    pub async fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        periods: usize,
    ) -> AnalysisResult<Vec<Candle>> {
        let key = (symbol.to_uppercase(), timeframe, periods);
        self.candle_cache
            .get_or_fetch(key.clone(), || async move {
                let id = self.resolve_id(&key.0).await?;
                let candles = self.primary.fetch_ohlcv(&id, timeframe, periods).await?;
                if candles.is_empty() {
                    return Err(AnalysisError::InsufficientData(format!(
                        "no {} candles available for {}",
                        timeframe, key.0
                    )));
                }
                Ok(candles)
            })
            .await
    }

    async fn resolve_id(&self, symbol: &str) -> AnalysisResult<String> {
        let upper = symbol.to_uppercase();
        if let Some(id) = self.id_cache.read().await.get(&upper) {
            return Ok(id.clone());
        }

        let id = self.primary.resolve(&upper).await?;
        debug!(symbol = %upper, id = %id, "resolved upstream id");
        self.id_cache.write().await.insert(upper, id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        name: &'static str,
        ticker_result: fn() -> AnalysisResult<PriceSnapshot>,
        ohlcv_result: fn() -> AnalysisResult<Vec<Candle>>,
        resolve_calls: AtomicUsize,
        ticker_calls: AtomicUsize,
    }

    impl StubSource {
        fn new(
            name: &'static str,
            ticker_result: fn() -> AnalysisResult<PriceSnapshot>,
            ohlcv_result: fn() -> AnalysisResult<Vec<Candle>>,
        ) -> Self {
            Self {
                name,
                ticker_result,
                ohlcv_result,
                resolve_calls: AtomicUsize::new(0),
                ticker_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn resolve(&self, symbol: &str) -> AnalysisResult<String> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("id-{}", symbol.to_lowercase()))
        }

        async fn fetch_ticker(&self, _id: &str) -> AnalysisResult<PriceSnapshot> {
            self.ticker_calls.fetch_add(1, Ordering::SeqCst);
            (self.ticker_result)()
        }

        async fn fetch_ohlcv(
            &self,
            _id: &str,
            _timeframe: Timeframe,
            _periods: usize,
        ) -> AnalysisResult<Vec<Candle>> {
            (self.ohlcv_result)()
        }
    }

    fn good_snapshot() -> AnalysisResult<PriceSnapshot> {
        Ok(PriceSnapshot::new("BTC", 50_000.0, Utc::now().timestamp()))
    }

    fn secondary_snapshot() -> AnalysisResult<PriceSnapshot> {
        Ok(PriceSnapshot::new("BTC", 49_990.0, Utc::now().timestamp()))
    }

    fn payment_required<T>() -> AnalysisResult<T> {
        Err(AnalysisError::PaymentRequired("paid tier".to_string()))
    }

    fn some_candles() -> AnalysisResult<Vec<Candle>> {
        Ok((0..30)
            .map(|i| Candle::new(i * 86_400, 100.0, 101.0, 99.0, 100.5, 10.0))
            .collect())
    }

    #[tokio::test]
    async fn test_snapshot_prefers_primary() {
        let primary = Arc::new(StubSource::new("p", good_snapshot, some_candles));
        let secondary = Arc::new(StubSource::new("s", secondary_snapshot, some_candles));
        let provider = MarketDataProvider::new(primary.clone(), secondary.clone());

        let snap = provider.snapshot("btc").await.unwrap();
        assert_eq!(snap.price, 50_000.0);
        assert_eq!(secondary.ticker_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_snapshot_falls_back_on_primary_failure() {
        let primary = Arc::new(StubSource::new("p", payment_required, payment_required));
        let secondary = Arc::new(StubSource::new("s", secondary_snapshot, some_candles));
        let provider = MarketDataProvider::new(primary, secondary.clone());

        let snap = provider.snapshot("BTC").await.unwrap();
        assert_eq!(snap.price, 49_990.0);
        assert_eq!(secondary.ticker_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_candles_never_fall_back() {
        let primary = Arc::new(StubSource::new("p", good_snapshot, payment_required));
        let secondary = Arc::new(StubSource::new("s", secondary_snapshot, some_candles));
        let provider = MarketDataProvider::new(primary, secondary);

        let err = provider.candles("BTC", Timeframe::FourHour, 100).await.unwrap_err();
        assert!(matches!(err, AnalysisError::PaymentRequired(_)));
    }

    #[tokio::test]
    async fn test_snapshot_cache_avoids_second_fetch() {
        let primary = Arc::new(StubSource::new("p", good_snapshot, some_candles));
        let secondary = Arc::new(StubSource::new("s", secondary_snapshot, some_candles));
        let provider = MarketDataProvider::new(primary.clone(), secondary);

        provider.snapshot("BTC").await.unwrap();
        provider.snapshot("btc").await.unwrap();
        assert_eq!(primary.ticker_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolved_ids_are_cached() {
        let primary = Arc::new(StubSource::new("p", good_snapshot, some_candles));
        let secondary = Arc::new(StubSource::new("s", secondary_snapshot, some_candles));
        let provider = MarketDataProvider::new(primary.clone(), secondary);

        provider.candles("BTC", Timeframe::Daily, 30).await.unwrap();
        provider.candles("BTC", Timeframe::Weekly, 30).await.unwrap();
        assert_eq!(primary.resolve_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_history_is_insufficient_data() {
        fn empty() -> AnalysisResult<Vec<Candle>> {
            Ok(Vec::new())
        }
        let primary = Arc::new(StubSource::new("p", good_snapshot, empty));
        let secondary = Arc::new(StubSource::new("s", secondary_snapshot, some_candles));
        let provider = MarketDataProvider::new(primary, secondary);

        let err = provider.candles("BTC", Timeframe::Daily, 30).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }
}
