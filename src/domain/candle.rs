use serde::{Deserialize, Serialize};

/// A single OHLCV bar. Timestamps are unix seconds, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Absolute size of the candle body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Distance from the body top to the high.
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Distance from the body bottom to the low.
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// A doji has a body no larger than 10% of the full range.
    pub fn is_doji(&self) -> bool {
        self.body() <= 0.1 * self.range()
    }

    /// (high + low + close) / 3, used for volume profiling.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(0, open, high, low, close, 1000.0)
    }

    #[test]
    fn test_body_and_shadows() {
        let c = candle(100.0, 112.0, 95.0, 108.0);
        assert_eq!(c.body(), 8.0);
        assert_eq!(c.upper_shadow(), 4.0);
        assert_eq!(c.lower_shadow(), 5.0);
        assert_eq!(c.range(), 17.0);
    }

    #[test]
    fn test_bearish_body_and_shadows() {
        let c = candle(108.0, 112.0, 95.0, 100.0);
        assert_eq!(c.body(), 8.0);
        assert_eq!(c.upper_shadow(), 4.0);
        assert_eq!(c.lower_shadow(), 5.0);
        assert!(c.is_bearish());
        assert!(!c.is_bullish());
    }

    #[test]
    fn test_doji_detection() {
        // Body of 0.5 against a range of 10 -> doji
        let c = candle(100.0, 105.0, 95.0, 100.5);
        assert!(c.is_doji());

        // Body of 2 against a range of 10 -> not a doji
        let c = candle(100.0, 105.0, 95.0, 102.0);
        assert!(!c.is_doji());
    }

    #[test]
    fn test_typical_price() {
        let c = candle(100.0, 110.0, 90.0, 100.0);
        assert_eq!(c.typical_price(), 100.0);
    }
}
