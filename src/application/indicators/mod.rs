//! Rolling technical indicators over a candle series.
//!
//! Each indicator emits one [`IndicatorValue`] per bar once its warm-up is
//! satisfied, carrying a per-bar verdict. The engine computes a selectable
//! set and folds the latest verdicts into a weighted composite signal.

mod bollinger;
mod macd;
mod moving_average;
mod oscillators;
mod volume;

pub use bollinger::bollinger;
pub use macd::macd;
pub use moving_average::{ema, sma};
pub use oscillators::{rsi, stochastic, williams_r};
pub use volume::obv;

pub(crate) use moving_average::ema_series;

use crate::domain::candle::Candle;
use crate::domain::signal::{IndicatorValue, TradingSignal};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Stochastic,
    WilliamsR,
    Obv,
}

impl IndicatorKind {
    pub fn all() -> [IndicatorKind; 8] {
        [
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::Rsi,
            IndicatorKind::Macd,
            IndicatorKind::Bollinger,
            IndicatorKind::Stochastic,
            IndicatorKind::WilliamsR,
            IndicatorKind::Obv,
        ]
    }
}

impl FromStr for IndicatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "rsi" => Ok(IndicatorKind::Rsi),
            "macd" => Ok(IndicatorKind::Macd),
            "bollinger" | "bb" | "bollinger_bands" => Ok(IndicatorKind::Bollinger),
            "stochastic" | "stoch" => Ok(IndicatorKind::Stochastic),
            "williams_r" | "willr" | "williams" => Ok(IndicatorKind::WilliamsR),
            "obv" => Ok(IndicatorKind::Obv),
            _ => Err(anyhow!("Unknown indicator: '{}'", s)),
        }
    }
}

/// All emissions of one indicator over a series.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub values: Vec<IndicatorValue>,
}

impl IndicatorSeries {
    pub fn latest(&self) -> Option<&IndicatorValue> {
        self.values.last()
    }
}

/// Weighted aggregate of a set of indicator verdicts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CompositeSignal {
    pub signal: TradingSignal,
    pub score: f64,
    pub confidence: f64,
}

/// Parameterized indicator computation over an immutable candle snapshot.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub williams_period: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_period: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
            stochastic_k: 14,
            stochastic_d: 3,
            williams_period: 14,
        }
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the requested indicators. Indicators whose warm-up exceeds
    /// the series simply produce an empty value list.
    pub fn compute(&self, candles: &[Candle], kinds: &[IndicatorKind]) -> Vec<IndicatorSeries> {
        kinds
            .iter()
            .map(|&kind| {
                let values = match kind {
                    IndicatorKind::Sma => sma(candles, self.sma_period),
                    IndicatorKind::Ema => ema(candles, self.ema_period),
                    IndicatorKind::Rsi => rsi(candles, self.rsi_period),
                    IndicatorKind::Macd => {
                        macd(candles, self.macd_fast, self.macd_slow, self.macd_signal)
                    }
                    IndicatorKind::Bollinger => {
                        bollinger(candles, self.bollinger_period, self.bollinger_k)
                    }
                    IndicatorKind::Stochastic => {
                        stochastic(candles, self.stochastic_k, self.stochastic_d)
                    }
                    IndicatorKind::WilliamsR => williams_r(candles, self.williams_period),
                    IndicatorKind::Obv => obv(candles),
                };
                IndicatorSeries { kind, values }
            })
            .collect()
    }

    pub fn compute_all(&self, candles: &[Candle]) -> Vec<IndicatorSeries> {
        self.compute(candles, &IndicatorKind::all())
    }

    /// Latest emission of each computed indicator, skipping any still in
    /// warm-up.
    pub fn latest_values(series: &[IndicatorSeries]) -> Vec<IndicatorValue> {
        series
            .iter()
            .filter_map(|s| s.latest().cloned())
            .collect()
    }

    /// Fold verdicts into one weighted score: StrongBuy +2 .. StrongSell -2,
    /// averaged over the set. Score >= +0.5 buys, <= -0.5 sells.
    pub fn composite(signals: &[TradingSignal]) -> CompositeSignal {
        if signals.is_empty() {
            return CompositeSignal {
                signal: TradingSignal::Hold,
                score: 0.0,
                confidence: 0.0,
            };
        }

        let total: i32 = signals.iter().map(|s| s.numeric()).sum();
        let score = total as f64 / signals.len() as f64;

        let signal = if score >= 0.5 {
            TradingSignal::Buy
        } else if score <= -0.5 {
            TradingSignal::Sell
        } else {
            TradingSignal::Hold
        };

        CompositeSignal {
            signal,
            score,
            confidence: (score.abs() / 2.0).min(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(IndicatorKind::from_str("rsi").unwrap(), IndicatorKind::Rsi);
        assert_eq!(
            IndicatorKind::from_str("BB").unwrap(),
            IndicatorKind::Bollinger
        );
        assert_eq!(
            IndicatorKind::from_str("willr").unwrap(),
            IndicatorKind::WilliamsR
        );
        assert!(IndicatorKind::from_str("vwap").is_err());
    }

    #[test]
    fn test_composite_thresholds() {
        use TradingSignal::*;

        // 3 of 4 buys: score 0.75 -> Buy
        let c = IndicatorEngine::composite(&[Buy, Buy, Buy, Hold]);
        assert_eq!(c.signal, Buy);
        assert_eq!(c.score, 0.75);

        // Mixed: score 0.125 -> Hold
        let c = IndicatorEngine::composite(&[Buy, Buy, Sell, Hold, Hold, Hold, Hold, Buy]);
        assert_eq!(c.signal, Hold);

        // Strong sells dominate
        let c = IndicatorEngine::composite(&[StrongSell, StrongSell, Sell, Hold]);
        assert_eq!(c.signal, Sell);
        assert!(c.score <= -0.5);
    }

    #[test]
    fn test_composite_confidence_clamped() {
        use TradingSignal::*;
        let c = IndicatorEngine::composite(&[StrongBuy, StrongBuy]);
        assert_eq!(c.score, 2.0);
        assert_eq!(c.confidence, 1.0);

        let c = IndicatorEngine::composite(&[Buy, Hold]);
        assert_eq!(c.confidence, 0.25);
    }

    #[test]
    fn test_empty_composite_is_neutral() {
        let c = IndicatorEngine::composite(&[]);
        assert_eq!(c.signal, TradingSignal::Hold);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_compute_selection() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let c = 100.0 + i as f64;
                Candle::new(i as i64 * 86400, c, c + 0.5, c - 0.5, c, 1000.0)
            })
            .collect();

        let engine = IndicatorEngine::new();
        let series = engine.compute(&candles, &[IndicatorKind::Sma, IndicatorKind::Rsi]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].kind, IndicatorKind::Sma);
        assert!(!series[0].values.is_empty());
        assert_eq!(series[1].values.len(), 40 - 14);
    }
}
