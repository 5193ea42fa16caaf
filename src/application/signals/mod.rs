//! Composite trading-signal aggregation.
//!
//! Folds the indicator composite, proximity to support/resistance, and the
//! qualifying chart patterns into one primary verdict with entry, stop,
//! target and a written rationale.

use crate::application::indicators::CompositeSignal;
use crate::application::levels::LevelAnalysis;
use crate::domain::level::Level;
use crate::domain::pattern::ChartPattern;
use crate::domain::risk::RiskLevel;
use crate::domain::signal::{
    IndicatorValue, SignalContribution, TradeSignal, TradingSignal,
};

/// Distance within which a level pulls the verdict its way.
const LEVEL_PULL: f64 = 0.02;

/// Distance within which a level is worth mentioning in the rationale.
const LEVEL_MENTION: f64 = 0.03;

#[derive(Debug, Clone, Default)]
pub struct SignalAggregator;

impl SignalAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        price: f64,
        composite: &CompositeSignal,
        latest_indicators: &[IndicatorValue],
        patterns: &[ChartPattern],
        levels: &LevelAnalysis,
        risk: RiskLevel,
    ) -> TradeSignal {
        let support = levels.nearest_below(price);
        let resistance = levels.nearest_above(price);

        let mut breakdown = vec![SignalContribution {
            source: "indicators".to_string(),
            signal: composite.signal,
            detail: format!("composite score {:.2}", composite.score),
        }];

        breakdown.push(self.level_contribution(price, support, resistance));

        let threshold = risk.signal_threshold();
        for pattern in patterns.iter().filter(|p| p.confidence >= threshold) {
            let signal = if pattern.kind.is_bullish() {
                TradingSignal::Buy
            } else {
                TradingSignal::Sell
            };
            breakdown.push(SignalContribution {
                source: format!("pattern:{}", pattern.kind),
                signal,
                detail: format!("confidence {:.2}", pattern.confidence),
            });
        }

        let signals: Vec<TradingSignal> = breakdown.iter().map(|c| c.signal).collect();
        let (signal, confidence) = majority(&signals);

        let (stop_loss, take_profit) = match signal {
            TradingSignal::Buy | TradingSignal::StrongBuy => (
                Some(support.map(|l| l.price * 0.98).unwrap_or(price * 0.95)),
                Some(resistance.map(|l| l.price * 0.98).unwrap_or(price * 1.10)),
            ),
            TradingSignal::Sell | TradingSignal::StrongSell => (
                Some(resistance.map(|l| l.price * 1.02).unwrap_or(price * 1.05)),
                Some(support.map(|l| l.price * 1.02).unwrap_or(price * 0.90)),
            ),
            TradingSignal::Hold => (None, None),
        };

        let reasoning = self.reasoning(price, latest_indicators, patterns, support, resistance);

        TradeSignal {
            signal,
            confidence,
            entry: price,
            stop_loss,
            take_profit,
            reasoning,
            breakdown,
        }
    }

    fn level_contribution(
        &self,
        price: f64,
        support: Option<&Level>,
        resistance: Option<&Level>,
    ) -> SignalContribution {
        if let Some(s) = support {
            if (price - s.price).abs() <= price * LEVEL_PULL {
                return SignalContribution {
                    source: "levels".to_string(),
                    signal: TradingSignal::Buy,
                    detail: format!("price sits on support at {:.2}", s.price),
                };
            }
        }
        if let Some(r) = resistance {
            if (price - r.price).abs() <= price * LEVEL_PULL {
                return SignalContribution {
                    source: "levels".to_string(),
                    signal: TradingSignal::Sell,
                    detail: format!("price presses resistance at {:.2}", r.price),
                };
            }
        }
        SignalContribution {
            source: "levels".to_string(),
            signal: TradingSignal::Hold,
            detail: "no nearby level".to_string(),
        }
    }

    fn reasoning(
        &self,
        price: f64,
        latest_indicators: &[IndicatorValue],
        patterns: &[ChartPattern],
        support: Option<&Level>,
        resistance: Option<&Level>,
    ) -> String {
        let mut parts = Vec::new();

        if let Some(rsi) = latest_indicators.iter().find(|v| v.name.starts_with("RSI")) {
            if rsi.value >= 70.0 {
                parts.push(format!("RSI at {:.1} signals overbought conditions", rsi.value));
            } else if rsi.value <= 30.0 {
                parts.push(format!("RSI at {:.1} signals oversold conditions", rsi.value));
            } else {
                parts.push(format!("RSI neutral at {:.1}", rsi.value));
            }
        }

        if !patterns.is_empty() {
            let names: Vec<String> = patterns.iter().map(|p| p.kind.to_string()).collect();
            parts.push(format!("detected patterns: {}", names.join(", ")));
        }

        if let Some(s) = support {
            if (price - s.price).abs() <= price * LEVEL_MENTION {
                parts.push(format!("price is near support at {:.2}", s.price));
            }
        }
        if let Some(r) = resistance {
            if (price - r.price).abs() <= price * LEVEL_MENTION {
                parts.push(format!("price is near resistance at {:.2}", r.price));
            }
        }

        if parts.is_empty() {
            "no notable technical signals".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// 60% majority rule: buys or sells must hold at least six tenths of the
/// bag to carry the verdict; the winning share becomes the confidence.
pub(crate) fn majority(signals: &[TradingSignal]) -> (TradingSignal, f64) {
    if signals.is_empty() {
        return (TradingSignal::Hold, 0.5);
    }

    let total = signals.len() as f64;
    let buys = signals.iter().filter(|s| s.is_buy()).count() as f64;
    let sells = signals.iter().filter(|s| s.is_sell()).count() as f64;

    if buys / total >= 0.6 {
        (TradingSignal::Buy, buys / total)
    } else if sells / total >= 0.6 {
        (TradingSignal::Sell, sells / total)
    } else {
        (TradingSignal::Hold, 0.5)
    }
}
