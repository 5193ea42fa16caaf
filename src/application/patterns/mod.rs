//! Chart and candlestick pattern recognition.
//!
//! Pivot extraction feeds the geometric detectors; candlestick shapes scan
//! the raw series. Detections are returned sorted by descending confidence.

mod candlestick;
mod continuation;
mod pivots;
mod reversal;

pub(crate) use pivots::{find_pivots, Pivot};

use crate::domain::candle::Candle;
use crate::domain::pattern::ChartPattern;

/// Minimum series length before any pattern scan runs.
const MIN_CANDLES: usize = 10;

/// Relative price tolerance used across geometric detections.
pub(crate) const PRICE_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    tolerance: f64,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self {
            tolerance: PRICE_TOLERANCE,
        }
    }
}

impl PatternRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All detections over the series, strongest first. Series shorter than
    /// ten candles produce nothing.
    pub fn detect(&self, candles: &[Candle]) -> Vec<ChartPattern> {
        if candles.len() < MIN_CANDLES {
            return Vec::new();
        }

        let pivots = find_pivots(candles);

        let mut patterns = Vec::new();
        patterns.extend(reversal::detect_head_and_shoulders(&pivots, self.tolerance));
        patterns.extend(reversal::detect_double_triple(&pivots, self.tolerance));
        patterns.extend(continuation::detect_continuations(&pivots, self.tolerance));
        patterns.extend(candlestick::detect_candlesticks(candles));

        patterns.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        patterns
    }
}
