//! Full-analysis orchestration.
//!
//! One immutable candle snapshot feeds indicators, patterns and levels in
//! parallel; the aggregator folds their verdicts into a trade signal. The
//! multi-timeframe variant fans out over all four timeframes and degrades
//! per timeframe.

use crate::application::indicators::{
    ema_series, CompositeSignal, IndicatorEngine, IndicatorKind, IndicatorSeries,
};
use crate::application::levels::{LevelAnalyzer, LevelAnalysis};
use crate::application::patterns::PatternRecognizer;
use crate::application::signals::SignalAggregator;
use crate::domain::candle::Candle;
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::level::Level;
use crate::domain::pattern::ChartPattern;
use crate::domain::risk::RiskLevel;
use crate::domain::signal::{IndicatorValue, TradeSignal, TradingSignal, TrendDirection};
use crate::domain::snapshot::PriceSnapshot;
use crate::domain::timeframe::Timeframe;
use crate::infrastructure::provider::MarketDataProvider;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Number of historical periods fetched for analysis.
pub const DEFAULT_PERIODS: usize = 100;

#[derive(Debug, Clone)]
pub struct FullAnalysis {
    pub snapshot: PriceSnapshot,
    pub timeframe: Timeframe,
    pub risk: RiskLevel,
    pub indicators: Vec<IndicatorSeries>,
    pub composite: CompositeSignal,
    pub patterns: Vec<ChartPattern>,
    pub levels: LevelAnalysis,
    pub signal: TradeSignal,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub data_points: usize,
}

#[derive(Debug, Clone)]
pub struct TimeframeAnalysis {
    pub timeframe: Timeframe,
    pub trend: TrendDirection,
    pub composite: CompositeSignal,
    pub indicators: Vec<IndicatorValue>,
    pub patterns: Vec<ChartPattern>,
    pub levels: Vec<Level>,
}

#[derive(Debug, Clone)]
pub struct MultiTimeframeAnalysis {
    pub snapshot: PriceSnapshot,
    pub timeframes: Vec<TimeframeAnalysis>,
    pub summary: String,
}

pub struct AnalysisService {
    provider: Arc<MarketDataProvider>,
    indicators: IndicatorEngine,
    patterns: PatternRecognizer,
    levels: LevelAnalyzer,
    aggregator: SignalAggregator,
}

impl AnalysisService {
    pub fn new(provider: Arc<MarketDataProvider>) -> Self {
        Self {
            provider,
            indicators: IndicatorEngine::new(),
            patterns: PatternRecognizer::new(),
            levels: LevelAnalyzer::new(),
            aggregator: SignalAggregator::new(),
        }
    }

    pub fn provider(&self) -> &Arc<MarketDataProvider> {
        &self.provider
    }

    pub async fn snapshot(&self, symbol: &str) -> AnalysisResult<PriceSnapshot> {
        self.provider.snapshot(symbol).await
    }

    /// Latest values for the requested indicator set.
    pub async fn indicator_values(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        kinds: &[IndicatorKind],
    ) -> AnalysisResult<(Vec<IndicatorSeries>, usize)> {
        let candles = self.provider.candles(symbol, timeframe, DEFAULT_PERIODS).await?;
        let series = self.indicators.compute(&candles, kinds);
        Ok((series, candles.len()))
    }

    pub async fn chart_patterns(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> AnalysisResult<Vec<ChartPattern>> {
        let candles = self.provider.candles(symbol, timeframe, DEFAULT_PERIODS).await?;
        Ok(self.patterns.detect(&candles))
    }

    pub async fn support_resistance(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> AnalysisResult<(LevelAnalysis, f64)> {
        let (candles, snapshot) = tokio::try_join!(
            self.provider.candles(symbol, timeframe, DEFAULT_PERIODS),
            self.provider.snapshot(symbol)
        )?;
        let analysis = self
            .levels
            .analyze(&candles, snapshot.price, Utc::now().timestamp())?;
        Ok((analysis, snapshot.price))
    }

    /// The full pipeline: snapshot + candles, then indicators, patterns
    /// and levels on the same immutable series, then aggregation.
    pub async fn full_analysis(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        risk: RiskLevel,
    ) -> AnalysisResult<FullAnalysis> {
        let (candles, snapshot) = tokio::try_join!(
            self.provider.candles(symbol, timeframe, DEFAULT_PERIODS),
            self.provider.snapshot(symbol)
        )?;

        info!(
            symbol = %snapshot.symbol,
            timeframe = %timeframe,
            candles = candles.len(),
            "running full analysis"
        );

        let candles = Arc::new(candles);
        let price = snapshot.price;
        let now = Utc::now().timestamp();

        // CPU-bound scans fan out; each works on the shared series
        let indicators_task = {
            let engine = self.indicators.clone();
            let candles = candles.clone();
            tokio::task::spawn_blocking(move || engine.compute_all(&candles))
        };
        let patterns_task = {
            let recognizer = self.patterns.clone();
            let candles = candles.clone();
            tokio::task::spawn_blocking(move || recognizer.detect(&candles))
        };
        let levels_task = {
            let analyzer = self.levels.clone();
            let candles = candles.clone();
            tokio::task::spawn_blocking(move || analyzer.analyze(&candles, price, now))
        };

        let (indicators, patterns, levels) =
            tokio::try_join!(indicators_task, patterns_task, levels_task)
                .map_err(|e| AnalysisError::Unknown(format!("analysis task failed: {}", e)))?;
        let levels = levels?;

        let latest = IndicatorEngine::latest_values(&indicators);
        let verdicts: Vec<TradingSignal> = latest.iter().map(|v| v.signal).collect();
        let composite = IndicatorEngine::composite(&verdicts);

        let signal =
            self.aggregator
                .aggregate(price, &composite, &latest, &patterns, &levels, risk);

        let summary = self.summarize(&snapshot, timeframe, &composite, &patterns, &signal);
        let recommendations = self.recommend(&signal, &levels, risk);

        Ok(FullAnalysis {
            snapshot,
            timeframe,
            risk,
            indicators,
            composite,
            patterns,
            levels,
            signal,
            summary,
            recommendations,
            data_points: candles.len(),
        })
    }

    /// Run all four timeframes concurrently. A timeframe that fails is
    /// dropped from the result instead of failing the whole call.
    pub async fn multi_timeframe(&self, symbol: &str) -> AnalysisResult<MultiTimeframeAnalysis> {
        let snapshot = self.provider.snapshot(symbol).await?;
        let price = snapshot.price;

        let tasks = Timeframe::all().map(|tf| self.timeframe_analysis(symbol, tf, price));
        let results = futures::future::join_all(tasks).await;

        let mut timeframes = Vec::new();
        for (tf, result) in Timeframe::all().into_iter().zip(results) {
            match result {
                Ok(analysis) => timeframes.push(analysis),
                Err(e) => {
                    warn!(timeframe = %tf, error = %e, "timeframe analysis dropped");
                }
            }
        }

        if timeframes.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "no timeframe produced data for {}",
                symbol
            )));
        }

        let summary = self.summarize_timeframes(&snapshot, &timeframes);
        Ok(MultiTimeframeAnalysis {
            snapshot,
            timeframes,
            summary,
        })
    }

    async fn timeframe_analysis(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        price: f64,
    ) -> AnalysisResult<TimeframeAnalysis> {
        let candles = self.provider.candles(symbol, timeframe, DEFAULT_PERIODS).await?;

        let series = self.indicators.compute_all(&candles);
        let latest = IndicatorEngine::latest_values(&series);
        let verdicts: Vec<TradingSignal> = latest.iter().map(|v| v.signal).collect();
        let composite = IndicatorEngine::composite(&verdicts);
        let patterns = self.patterns.detect(&candles);
        let levels = self
            .levels
            .analyze(&candles, price, Utc::now().timestamp())
            .map(|a| a.levels)
            .unwrap_or_default();

        Ok(TimeframeAnalysis {
            timeframe,
            trend: trend_direction(&candles),
            composite,
            indicators: latest,
            patterns,
            levels,
        })
    }

    fn summarize(
        &self,
        snapshot: &PriceSnapshot,
        timeframe: Timeframe,
        composite: &CompositeSignal,
        patterns: &[ChartPattern],
        signal: &TradeSignal,
    ) -> String {
        let pattern_note = match patterns.len() {
            0 => "no chart patterns detected".to_string(),
            1 => format!("1 chart pattern detected ({})", patterns[0].kind),
            n => format!("{} chart patterns detected, strongest: {}", n, patterns[0].kind),
        };

        format!(
            "{} trades at {:.4} on the {} timeframe. Indicators lean {} (score {:.2}); {}. Overall signal: {} with {:.0}% confidence.",
            snapshot.symbol,
            snapshot.price,
            timeframe,
            composite.signal,
            composite.score,
            pattern_note,
            signal.signal,
            signal.confidence * 100.0
        )
    }

    fn recommend(
        &self,
        signal: &TradeSignal,
        levels: &LevelAnalysis,
        risk: RiskLevel,
    ) -> Vec<String> {
        let mut out = Vec::new();

        match signal.signal {
            TradingSignal::Buy | TradingSignal::StrongBuy => {
                out.push(format!("Consider a long entry near {:.4}", signal.entry));
                if let Some(stop) = signal.stop_loss {
                    out.push(format!("Place a protective stop near {:.4}", stop));
                }
                if let Some(target) = signal.take_profit {
                    out.push(format!("Take profit near {:.4}", target));
                }
            }
            TradingSignal::Sell | TradingSignal::StrongSell => {
                out.push(format!("Consider reducing exposure near {:.4}", signal.entry));
                if let Some(stop) = signal.stop_loss {
                    out.push(format!("Invalidate the short view above {:.4}", stop));
                }
                if let Some(target) = signal.take_profit {
                    out.push(format!("Cover near {:.4}", target));
                }
            }
            TradingSignal::Hold => {
                out.push("No edge at current prices; wait for a clearer setup".to_string());
                if let Some(support) = levels.nearest_below(signal.entry) {
                    out.push(format!("Watch support at {:.4}", support.price));
                }
                if let Some(resistance) = levels.nearest_above(signal.entry) {
                    out.push(format!("Watch resistance at {:.4}", resistance.price));
                }
            }
        }

        out.push(format!(
            "Signals below the {:.0}% confidence threshold were ignored for the {} risk profile",
            risk.signal_threshold() * 100.0,
            risk
        ));
        out
    }

    fn summarize_timeframes(
        &self,
        snapshot: &PriceSnapshot,
        timeframes: &[TimeframeAnalysis],
    ) -> String {
        let bullish = timeframes
            .iter()
            .filter(|t| t.trend == TrendDirection::Bullish)
            .count();
        let bearish = timeframes
            .iter()
            .filter(|t| t.trend == TrendDirection::Bearish)
            .count();
        let total = timeframes.len();

        let alignment = if bullish == total {
            "all timeframes aligned bullish".to_string()
        } else if bearish == total {
            "all timeframes aligned bearish".to_string()
        } else if bullish > bearish {
            format!("{} of {} timeframes lean bullish", bullish, total)
        } else if bearish > bullish {
            format!("{} of {} timeframes lean bearish", bearish, total)
        } else {
            "timeframes are split with no clear alignment".to_string()
        };

        format!(
            "{} at {:.4}: {} across {} analyzed timeframes.",
            snapshot.symbol, snapshot.price, alignment, total
        )
    }
}

/// Trend label from the fast/slow EMA relation over the closes.
pub fn trend_direction(candles: &[Candle]) -> TrendDirection {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = ema_series(&closes, 9);
    let slow = ema_series(&closes, 21);

    match (fast.last(), slow.last()) {
        (Some(&f), Some(&s)) if s != 0.0 => {
            let ratio = f / s;
            if ratio > 1.02 {
                TrendDirection::Bullish
            } else if ratio < 0.98 {
                TrendDirection::Bearish
            } else {
                TrendDirection::Neutral
            }
        }
        _ => TrendDirection::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 86_400, c, c + 0.5, c - 0.5, c, 1000.0))
            .collect()
    }

    #[test]
    fn test_trend_direction_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * (1.01f64).powi(i)).collect();
        let candles = candles_from_closes(&closes);
        assert_eq!(trend_direction(&candles), TrendDirection::Bullish);
    }

    #[test]
    fn test_trend_direction_downtrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * (0.99f64).powi(i)).collect();
        let candles = candles_from_closes(&closes);
        assert_eq!(trend_direction(&candles), TrendDirection::Bearish);
    }

    #[test]
    fn test_trend_direction_flat() {
        let candles = candles_from_closes(&[100.0; 60]);
        assert_eq!(trend_direction(&candles), TrendDirection::Neutral);
    }

    #[test]
    fn test_trend_direction_short_series() {
        let candles = candles_from_closes(&[100.0; 5]);
        assert_eq!(trend_direction(&candles), TrendDirection::Neutral);
    }
}
