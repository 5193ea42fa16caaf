use super::moving_average::sma_series;
use crate::domain::candle::Candle;
use crate::domain::signal::{IndicatorValue, TradingSignal};

/// Bollinger Bands over a population standard deviation. Emits the middle
/// band as the value, with upper/lower/bandwidth/%B in the parameter bag.
/// A zero band width reports %B as 0.5 so the verdict stays neutral.
pub fn bollinger(candles: &[Candle], period: usize, k: f64) -> Vec<IndicatorValue> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let middles = sma_series(&closes, period);
    let name = format!("BB_{}", period);
    let mut out = Vec::with_capacity(middles.len());

    for (i, &middle) in middles.iter().enumerate() {
        let bar = i + period - 1;
        let window = &closes[(bar + 1 - period)..=bar];
        let variance =
            window.iter().map(|c| (c - middle) * (c - middle)).sum::<f64>() / period as f64;
        let sigma = variance.sqrt();

        let upper = middle + k * sigma;
        let lower = middle - k * sigma;
        let width = upper - lower;
        let close = closes[bar];

        let percent_b = if width == 0.0 {
            0.5
        } else {
            (close - lower) / width
        };

        let signal = if percent_b >= 1.0 {
            TradingSignal::Sell
        } else if percent_b <= 0.0 {
            TradingSignal::Buy
        } else {
            TradingSignal::Hold
        };

        out.push(
            IndicatorValue::new(name.clone(), middle, signal, candles[bar].timestamp)
                .with_param("upper", upper)
                .with_param("lower", lower)
                .with_param("bandwidth", width)
                .with_param("percent_b", percent_b),
        );
    }
    out
}
