use super::moving_average::sma_series;
use crate::domain::candle::Candle;
use crate::domain::signal::{IndicatorValue, TradingSignal};

/// Relative Strength Index over simple rolling averages of gains and
/// losses (not Wilder's recursive smoothing). A window with no losses
/// emits exactly 100.
pub fn rsi(candles: &[Candle], period: usize) -> Vec<IndicatorValue> {
    if period == 0 || candles.len() <= period {
        return Vec::new();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let name = format!("RSI_{}", period);
    let mut out = Vec::with_capacity(closes.len() - period);

    for t in period..closes.len() {
        let mut gains = 0.0;
        let mut losses = 0.0;
        for i in (t - period + 1)..=t {
            let delta = closes[i] - closes[i - 1];
            if delta > 0.0 {
                gains += delta;
            } else {
                losses += -delta;
            }
        }
        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };

        let signal = if value >= 70.0 {
            TradingSignal::Sell
        } else if value <= 30.0 {
            TradingSignal::Buy
        } else {
            TradingSignal::Hold
        };

        out.push(IndicatorValue::new(
            name.clone(),
            value,
            signal,
            candles[t].timestamp,
        ));
    }
    out
}

/// Stochastic oscillator. Emits %K with %D in the parameter bag; a zero
/// high-low range pins %K at 50.
pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> Vec<IndicatorValue> {
    if k_period == 0 || d_period == 0 || candles.len() < k_period + d_period - 1 {
        return Vec::new();
    }

    let mut k_values = Vec::with_capacity(candles.len() - k_period + 1);
    for t in (k_period - 1)..candles.len() {
        let window = &candles[(t + 1 - k_period)..=t];
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let k = if high == low {
            50.0
        } else {
            100.0 * (candles[t].close - low) / (high - low)
        };
        k_values.push(k);
    }

    let d_values = sma_series(&k_values, d_period);
    let name = format!("STOCH_{}_{}", k_period, d_period);
    let mut out = Vec::with_capacity(d_values.len());

    for (i, &d) in d_values.iter().enumerate() {
        let k_idx = i + d_period - 1;
        let k = k_values[k_idx];
        let bar = k_idx + k_period - 1;

        let prev = if i > 0 {
            Some((k_values[k_idx - 1], d_values[i - 1]))
        } else {
            None
        };

        let signal = stochastic_signal(k, d, prev);
        out.push(
            IndicatorValue::new(name.clone(), k, signal, candles[bar].timestamp)
                .with_param("d", d),
        );
    }
    out
}

fn stochastic_signal(k: f64, d: f64, prev: Option<(f64, f64)>) -> TradingSignal {
    if k >= 80.0 && d >= 80.0 {
        return TradingSignal::Sell;
    }
    if k <= 20.0 && d <= 20.0 {
        return TradingSignal::Buy;
    }
    if let Some((prev_k, prev_d)) = prev {
        // Bullish cross under the overbought zone
        if k > d && prev_k <= prev_d && k < 80.0 {
            return TradingSignal::Buy;
        }
        // Bearish cross above the oversold zone
        if k < d && prev_k >= prev_d && k > 20.0 {
            return TradingSignal::Sell;
        }
    }
    TradingSignal::Hold
}

/// Williams %R. A zero range emits -50.
pub fn williams_r(candles: &[Candle], period: usize) -> Vec<IndicatorValue> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let name = format!("WILLR_{}", period);
    let mut out = Vec::with_capacity(candles.len() - period + 1);

    for t in (period - 1)..candles.len() {
        let window = &candles[(t + 1 - period)..=t];
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);

        let value = if high == low {
            -50.0
        } else {
            -100.0 * (high - candles[t].close) / (high - low)
        };

        let signal = if value >= -20.0 {
            TradingSignal::Sell
        } else if value <= -80.0 {
            TradingSignal::Buy
        } else {
            TradingSignal::Hold
        };

        out.push(IndicatorValue::new(
            name.clone(),
            value,
            signal,
            candles[t].timestamp,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 86400, c, c + 0.5, c - 0.5, c, 1000.0))
            .collect()
    }

    #[test]
    fn test_rsi_stays_in_range() {
        let closes: Vec<f64> = (0..50)
            .map(|i| 100.0 + ((i * 7919) % 13) as f64 - 6.0)
            .collect();
        let candles = candles_from_closes(&closes);
        for v in rsi(&candles, 14) {
            assert!((0.0..=100.0).contains(&v.value), "RSI {} out of range", v.value);
        }
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let out = rsi(&candles, 14);
        assert_eq!(out.last().unwrap().value, 100.0);
        assert_eq!(out.last().unwrap().signal, TradingSignal::Sell);
    }

    #[test]
    fn test_rsi_flat_series_is_100() {
        // No losses at all: avg_loss == 0 takes the guard branch
        let closes = vec![100.0; 30];
        let candles = candles_from_closes(&closes);
        for v in rsi(&candles, 14) {
            assert_eq!(v.value, 100.0);
        }
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let candles = candles_from_closes(&closes);
        let out = rsi(&candles, 14);
        assert_eq!(out.last().unwrap().value, 0.0);
        assert_eq!(out.last().unwrap().signal, TradingSignal::Buy);
    }

    #[test]
    fn test_rsi_emission_count() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        assert_eq!(rsi(&candles, 14).len(), 30 - 14);
    }

    #[test]
    fn test_stochastic_zero_range_pins_50() {
        let closes = vec![100.0; 30];
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64, c, c, c, c, 1000.0))
            .collect();
        let out = stochastic(&candles, 14, 3);
        assert!(!out.is_empty());
        for v in &out {
            assert_eq!(v.value, 50.0);
            assert_eq!(v.params["d"], 50.0);
        }
    }

    #[test]
    fn test_stochastic_overbought_sells() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let out = stochastic(&candles, 14, 3);
        let last = out.last().unwrap();
        assert!(last.value >= 80.0);
        assert_eq!(last.signal, TradingSignal::Sell);
    }

    #[test]
    fn test_williams_range_and_guard() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        for v in williams_r(&candles, 14) {
            assert!((-100.0..=0.0).contains(&v.value));
        }

        let flat: Vec<Candle> = (0..20)
            .map(|i| Candle::new(i as i64, 100.0, 100.0, 100.0, 100.0, 1.0))
            .collect();
        for v in williams_r(&flat, 14) {
            assert_eq!(v.value, -50.0);
        }
    }

    #[test]
    fn test_williams_near_high_sells() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let out = williams_r(&candles, 14);
        assert_eq!(out.last().unwrap().signal, TradingSignal::Sell);
    }
}
