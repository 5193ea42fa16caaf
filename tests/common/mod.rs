//! Shared fixtures: a scriptable quote source and candle builders.
#![allow(dead_code)]

use async_trait::async_trait;
use coinscope::domain::candle::Candle;
use coinscope::domain::errors::{AnalysisError, AnalysisResult};
use coinscope::domain::snapshot::PriceSnapshot;
use coinscope::domain::timeframe::Timeframe;
use coinscope::infrastructure::provider::QuoteSource;

type TickerFn = Box<dyn Fn() -> AnalysisResult<PriceSnapshot> + Send + Sync>;
type OhlcvFn = Box<dyn Fn(Timeframe) -> AnalysisResult<Vec<Candle>> + Send + Sync>;

pub struct MockSource {
    name: &'static str,
    ticker: TickerFn,
    ohlcv: OhlcvFn,
}

impl MockSource {
    pub fn new(name: &'static str, ticker: TickerFn, ohlcv: OhlcvFn) -> Self {
        Self {
            name,
            ticker,
            ohlcv,
        }
    }
}

#[async_trait]
impl QuoteSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(&self, symbol: &str) -> AnalysisResult<String> {
        Ok(format!("mock-{}", symbol.to_lowercase()))
    }

    async fn fetch_ticker(&self, _id: &str) -> AnalysisResult<PriceSnapshot> {
        (self.ticker)()
    }

    async fn fetch_ohlcv(
        &self,
        _id: &str,
        timeframe: Timeframe,
        _periods: usize,
    ) -> AnalysisResult<Vec<Candle>> {
        (self.ohlcv)(timeframe)
    }
}

pub fn payment_required<T>() -> AnalysisResult<T> {
    Err(AnalysisError::PaymentRequired(
        "intraday intervals need a paid tier".to_string(),
    ))
}

pub fn snapshot(symbol: &str, price: f64) -> PriceSnapshot {
    PriceSnapshot::new(symbol, price, 1_700_000_000)
}

/// Close-driven candles with a small symmetric range around each close.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Candle::new(
                1_700_000_000 + i as i64 * 86_400,
                c - 0.25,
                c + 0.25,
                c - 0.5,
                c,
                1_000.0,
            )
        })
        .collect()
}

/// A steadily rising series that produces enough bars for every warm-up.
pub fn trending_candles(len: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
    candles_from_closes(&closes)
}
