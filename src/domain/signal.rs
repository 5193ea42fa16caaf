use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Per-indicator and aggregate trading verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingSignal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl TradingSignal {
    /// Weight used by the composite score: StrongBuy +2 .. StrongSell -2.
    pub fn numeric(&self) -> i32 {
        match self {
            TradingSignal::StrongBuy => 2,
            TradingSignal::Buy => 1,
            TradingSignal::Hold => 0,
            TradingSignal::Sell => -1,
            TradingSignal::StrongSell => -2,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, TradingSignal::Buy | TradingSignal::StrongBuy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, TradingSignal::Sell | TradingSignal::StrongSell)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TradingSignal::StrongBuy => "strong_buy",
            TradingSignal::Buy => "buy",
            TradingSignal::Hold => "hold",
            TradingSignal::Sell => "sell",
            TradingSignal::StrongSell => "strong_sell",
        }
    }
}

impl fmt::Display for TradingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One indicator emission for one bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorValue {
    /// Indicator id including its parameters, e.g. "RSI_14".
    pub name: String,
    pub value: f64,
    pub signal: TradingSignal,
    /// Bar timestamp this value belongs to (unix seconds).
    pub timestamp: i64,
    /// Auxiliary outputs, e.g. Bollinger upper/lower or MACD histogram.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, f64>,
}

impl IndicatorValue {
    pub fn new(name: impl Into<String>, value: f64, signal: TradingSignal, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            value,
            signal,
            timestamp,
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: f64) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// Direction label for a timeframe's trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Bullish => write!(f, "bullish"),
            TrendDirection::Bearish => write!(f, "bearish"),
            TrendDirection::Neutral => write!(f, "neutral"),
        }
    }
}

/// Contribution of one analytics source to the aggregate verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalContribution {
    pub source: String,
    pub signal: TradingSignal,
    pub detail: String,
}

/// The composed trading signal returned by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub signal: TradingSignal,
    pub confidence: f64,
    pub entry: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub reasoning: String,
    pub breakdown: Vec<SignalContribution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_numerics() {
        assert_eq!(TradingSignal::StrongBuy.numeric(), 2);
        assert_eq!(TradingSignal::Buy.numeric(), 1);
        assert_eq!(TradingSignal::Hold.numeric(), 0);
        assert_eq!(TradingSignal::Sell.numeric(), -1);
        assert_eq!(TradingSignal::StrongSell.numeric(), -2);
    }

    #[test]
    fn test_buy_sell_classification() {
        assert!(TradingSignal::StrongBuy.is_buy());
        assert!(TradingSignal::Buy.is_buy());
        assert!(!TradingSignal::Hold.is_buy());
        assert!(TradingSignal::Sell.is_sell());
        assert!(TradingSignal::StrongSell.is_sell());
        assert!(!TradingSignal::Hold.is_sell());
    }

    #[test]
    fn test_indicator_value_params() {
        let v = IndicatorValue::new("BB_20", 100.0, TradingSignal::Hold, 0)
            .with_param("upper", 105.0)
            .with_param("lower", 95.0);
        assert_eq!(v.params.get("upper"), Some(&105.0));
        assert_eq!(v.params.get("lower"), Some(&95.0));
    }
}
