use crate::domain::candle::Candle;
use crate::domain::signal::{IndicatorValue, TradingSignal};

/// On-Balance Volume: running sum adding volume on up closes and
/// subtracting it on down closes. The verdict compares each bar's OBV with
/// the previous one.
pub fn obv(candles: &[Candle]) -> Vec<IndicatorValue> {
    let mut out = Vec::with_capacity(candles.len());
    let mut running = 0.0;
    let mut prev_obv: Option<f64> = None;
    let mut prev_close: Option<f64> = None;

    for candle in candles {
        if let Some(pc) = prev_close {
            if candle.close > pc {
                running += candle.volume;
            } else if candle.close < pc {
                running -= candle.volume;
            }
        }

        let signal = match prev_obv {
            Some(p) if running > p => TradingSignal::Buy,
            Some(p) if running < p => TradingSignal::Sell,
            _ => TradingSignal::Hold,
        };

        out.push(IndicatorValue::new(
            "OBV",
            running,
            signal,
            candle.timestamp,
        ));
        prev_obv = Some(running);
        prev_close = Some(candle.close);
    }
    out
}
