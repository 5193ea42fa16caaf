//! Indicator scenarios over literal candle series.

mod common;

use coinscope::application::indicators::{
    rsi, sma, IndicatorEngine, IndicatorKind,
};
use coinscope::domain::signal::TradingSignal;
use common::candles_from_closes;

#[test]
fn ascending_series_leans_buy() {
    // 30 daily candles, closes 100..129
    let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
    let candles = candles_from_closes(&closes);

    // SMA(5) last value is the mean of the last five closes
    let sma5 = sma(&candles, 5);
    assert_eq!(sma5.last().unwrap().value, 127.0);

    // RSI(14) sits above the midline in a pure uptrend
    let rsi14 = rsi(&candles, 14);
    assert!(rsi14.last().unwrap().value > 50.0);

    // The composite over the computed set comes out a buy
    let engine = IndicatorEngine::new();
    let series = engine.compute(
        &candles,
        &[
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::Rsi,
            IndicatorKind::Obv,
        ],
    );
    let latest = IndicatorEngine::latest_values(&series);
    let verdicts: Vec<TradingSignal> = latest.iter().map(|v| v.signal).collect();
    let composite = IndicatorEngine::composite(&verdicts);
    assert!(
        matches!(composite.signal, TradingSignal::Buy | TradingSignal::StrongBuy),
        "expected a buy, got {:?} (score {})",
        composite.signal,
        composite.score
    );
}

#[test]
fn flat_series_stays_neutral() {
    // Constant closes over 30 bars
    let candles = candles_from_closes(&[100.0; 30]);

    // No losses in any window: the zero-loss guard emits exactly 100
    for v in rsi(&candles, 14) {
        assert_eq!(v.value, 100.0);
    }

    // A flat moving average is neither rising nor falling
    let engine = IndicatorEngine::new();
    let series = engine.compute(&candles, &[IndicatorKind::Sma, IndicatorKind::Ema]);
    for s in &series {
        for v in &s.values {
            assert_eq!(v.signal, TradingSignal::Hold);
        }
    }
}

#[test]
fn warmup_emission_counts() {
    let candles = common::trending_candles(50);
    let engine = IndicatorEngine::new();

    let series = engine.compute(
        &candles,
        &[IndicatorKind::Sma, IndicatorKind::Ema, IndicatorKind::Rsi],
    );
    // SMA/EMA(20): L - p + 1; RSI(14): L - p
    assert_eq!(series[0].values.len(), 50 - 20 + 1);
    assert_eq!(series[1].values.len(), 50 - 20 + 1);
    assert_eq!(series[2].values.len(), 50 - 14);
}

#[test]
fn rsi_emissions_stay_in_range() {
    // Deterministic pseudo-random walk
    let mut closes = vec![100.0];
    let mut state = 0x2545F491u64;
    for _ in 0..80 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let step = ((state >> 33) % 700) as f64 / 100.0 - 3.5;
        let next: f64 = closes.last().unwrap() + step;
        closes.push(next.max(1.0));
    }
    let candles = candles_from_closes(&closes);

    for v in rsi(&candles, 14) {
        assert!((0.0..=100.0).contains(&v.value));
    }
}
