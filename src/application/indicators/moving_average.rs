use crate::domain::candle::Candle;
use crate::domain::signal::{IndicatorValue, TradingSignal};

/// Rolling arithmetic mean. Returns one value per bar from index
/// `period - 1`, so a length-L input yields `L - period + 1` values.
pub(crate) fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut window_sum: f64 = values[..period].iter().sum();
    out.push(window_sum / period as f64);

    for i in period..values.len() {
        window_sum += values[i] - values[i - period];
        out.push(window_sum / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period`
/// values, then EMA_t = v_t * a + EMA_{t-1} * (1 - a), a = 2 / (period + 1).
pub(crate) fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut prev = seed;

    for &v in &values[period..] {
        let next = v * alpha + prev * (1.0 - alpha);
        out.push(next);
        prev = next;
    }
    out
}

/// Trend verdict shared by SMA and EMA: buy above a rising average, sell
/// below a falling one.
fn trend_signal(close: f64, ma: f64, prev_ma: Option<f64>) -> TradingSignal {
    match prev_ma {
        Some(prev) if close > ma && ma > prev => TradingSignal::Buy,
        Some(prev) if close < ma && ma < prev => TradingSignal::Sell,
        _ => TradingSignal::Hold,
    }
}

pub fn sma(candles: &[Candle], period: usize) -> Vec<IndicatorValue> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let series = sma_series(&closes, period);
    let name = format!("SMA_{}", period);

    series
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let bar = i + period - 1;
            let prev = if i > 0 { Some(series[i - 1]) } else { None };
            let signal = trend_signal(candles[bar].close, value, prev);
            IndicatorValue::new(name.clone(), value, signal, candles[bar].timestamp)
        })
        .collect()
}

pub fn ema(candles: &[Candle], period: usize) -> Vec<IndicatorValue> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let series = ema_series(&closes, period);
    let name = format!("EMA_{}", period);

    series
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let bar = i + period - 1;
            let prev = if i > 0 { Some(series[i - 1]) } else { None };
            let signal = trend_signal(candles[bar].close, value, prev);
            IndicatorValue::new(name.clone(), value, signal, candles[bar].timestamp)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 86400, c, c, c, c, 1000.0))
            .collect()
    }

    #[test]
    fn test_sma_emission_count() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(sma_series(&closes, 5).len(), 26);
        assert_eq!(sma_series(&closes, 30).len(), 1);
        assert_eq!(sma_series(&closes, 31).len(), 0);
    }

    #[test]
    fn test_ema_emission_count() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(ema_series(&closes, 5).len(), 26);
        assert_eq!(ema_series(&closes, 30).len(), 1);
        assert_eq!(ema_series(&closes, 31).len(), 0);
    }

    #[test]
    fn test_sma_values() {
        let closes = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let out = sma_series(&closes, 3);
        assert_eq!(out, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let closes = vec![10.0, 20.0, 30.0, 40.0];
        let out = ema_series(&closes, 3);
        // Seed = mean(10, 20, 30) = 20; alpha = 0.5
        assert_eq!(out[0], 20.0);
        assert_eq!(out[1], 40.0 * 0.5 + 20.0 * 0.5);
    }

    #[test]
    fn test_uptrend_gives_buy() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let out = sma(&candles, 5);
        // Last close sits above a rising SMA
        assert_eq!(out.last().unwrap().signal, TradingSignal::Buy);
        // Mean of closes 125..129
        assert_eq!(out.last().unwrap().value, 127.0);
    }

    #[test]
    fn test_flat_series_gives_hold() {
        let closes = vec![100.0; 30];
        let candles = candles_from_closes(&closes);
        for v in sma(&candles, 5) {
            assert_eq!(v.signal, TradingSignal::Hold);
        }
        for v in ema(&candles, 5) {
            assert_eq!(v.signal, TradingSignal::Hold);
        }
    }

    #[test]
    fn test_downtrend_gives_sell() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let candles = candles_from_closes(&closes);
        let out = ema(&candles, 5);
        assert_eq!(out.last().unwrap().signal, TradingSignal::Sell);
    }
}
