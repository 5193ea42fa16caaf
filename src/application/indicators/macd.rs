use super::moving_average::ema_series;
use crate::domain::candle::Candle;
use crate::domain::signal::{IndicatorValue, TradingSignal};

/// MACD line = EMA(fast) - EMA(slow); signal line = EMA of the MACD line
/// over `signal_period`, seeded by the SMA of its first values; histogram =
/// MACD - signal. One emission per bar once the signal line exists.
pub fn macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<IndicatorValue> {
    if fast == 0 || slow == 0 || signal_period == 0 || fast >= slow {
        return Vec::new();
    }
    if candles.len() < slow + signal_period - 1 {
        return Vec::new();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast_ema = ema_series(&closes, fast);
    let slow_ema = ema_series(&closes, slow);

    // Both series are aligned on bar `slow - 1` onwards
    let offset = slow - fast;
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, &s)| fast_ema[i + offset] - s)
        .collect();

    // ema_series seeds with the SMA of the first `signal_period` values,
    // which is exactly the seeding the signal line needs.
    let signal_line = ema_series(&macd_line, signal_period);

    let name = format!("MACD_{}_{}_{}", fast, slow, signal_period);
    let mut out = Vec::with_capacity(signal_line.len());

    for (i, &sig) in signal_line.iter().enumerate() {
        let macd_idx = i + signal_period - 1;
        let value = macd_line[macd_idx];
        let histogram = value - sig;
        let bar = macd_idx + slow - 1;

        let verdict = if value > sig && histogram > 0.0 {
            TradingSignal::Buy
        } else if value < sig && histogram < 0.0 {
            TradingSignal::Sell
        } else {
            TradingSignal::Hold
        };

        out.push(
            IndicatorValue::new(name.clone(), value, verdict, candles[bar].timestamp)
                .with_param("signal", sig)
                .with_param("histogram", histogram),
        );
    }
    out
}
