use crate::domain::candle::Candle;
use crate::domain::pattern::{ChartPattern, PatternKind, PivotPoint, PointKind};

/// Scan the whole series for single-, double- and triple-bar candlestick
/// formations. Zero-range candles are skipped; they carry no shape.
pub(crate) fn detect_candlesticks(candles: &[Candle]) -> Vec<ChartPattern> {
    let mut out = Vec::new();

    for (i, candle) in candles.iter().enumerate() {
        if candle.range() <= 0.0 {
            continue;
        }

        if let Some(p) = single_bar(candle) {
            out.push(p);
        }
        if i >= 1 {
            if let Some(p) = engulfing(&candles[i - 1], candle) {
                out.push(p);
            }
        }
        if i >= 2 {
            if let Some(p) = star(&candles[i - 2], &candles[i - 1], candle) {
                out.push(p);
            }
        }
    }
    out
}

fn key_point(candle: &Candle, kind: PointKind) -> PivotPoint {
    PivotPoint::new(candle.timestamp, candle.close, kind)
}

fn single_bar(candle: &Candle) -> Option<ChartPattern> {
    let body = candle.body();
    let upper = candle.upper_shadow();
    let lower = candle.lower_shadow();

    // Doji first: a near-zero body outranks shadow geometry
    if candle.is_doji() {
        return Some(ChartPattern {
            kind: PatternKind::Doji,
            confidence: 0.5,
            start_time: candle.timestamp,
            end_time: candle.timestamp,
            key_points: vec![key_point(candle, PointKind::Breakout)],
            description: "Doji: open and close nearly equal, indecision".to_string(),
            target: None,
            stop_loss: None,
        });
    }

    if lower >= 2.0 * body && upper <= 0.1 * body {
        return Some(ChartPattern {
            kind: PatternKind::Hammer,
            confidence: 0.6,
            start_time: candle.timestamp,
            end_time: candle.timestamp,
            key_points: vec![key_point(candle, PointKind::Trough)],
            description: format!(
                "Hammer: long lower shadow ({:.2}) against a small body ({:.2})",
                lower, body
            ),
            target: None,
            stop_loss: None,
        });
    }

    if upper >= 2.0 * body && lower <= 0.1 * body {
        return Some(ChartPattern {
            kind: PatternKind::ShootingStar,
            confidence: 0.6,
            start_time: candle.timestamp,
            end_time: candle.timestamp,
            key_points: vec![key_point(candle, PointKind::Peak)],
            description: format!(
                "Shooting star: long upper shadow ({:.2}) against a small body ({:.2})",
                upper, body
            ),
            target: None,
            stop_loss: None,
        });
    }

    None
}

fn engulfing(prev: &Candle, cur: &Candle) -> Option<ChartPattern> {
    let bullish = prev.is_bearish()
        && cur.is_bullish()
        && cur.open <= prev.close
        && cur.close >= prev.open;
    let bearish = prev.is_bullish()
        && cur.is_bearish()
        && cur.open >= prev.close
        && cur.close <= prev.open;

    if !bullish && !bearish {
        return None;
    }

    let kind = if bullish {
        PatternKind::BullishEngulfing
    } else {
        PatternKind::BearishEngulfing
    };

    Some(ChartPattern {
        kind,
        confidence: 0.7,
        start_time: prev.timestamp,
        end_time: cur.timestamp,
        key_points: vec![
            key_point(prev, PointKind::Breakout),
            key_point(cur, PointKind::Breakout),
        ],
        description: format!(
            "{}: candle body {:.2}-{:.2} engulfs the prior {:.2}-{:.2}",
            kind.label(),
            cur.open,
            cur.close,
            prev.open,
            prev.close
        ),
        target: None,
        stop_loss: None,
    })
}

fn star(first: &Candle, middle: &Candle, third: &Candle) -> Option<ChartPattern> {
    let first_body = first.body();
    if first_body <= 0.0 || middle.body() > 0.3 * first_body {
        return None;
    }
    let first_mid = (first.open + first.close) / 2.0;

    // Morning star: down candle, small middle, up candle reclaiming past
    // the midpoint of the first body
    if first.is_bearish() && third.is_bullish() && third.close > first_mid {
        return Some(star_pattern(PatternKind::MorningStar, first, middle, third));
    }

    // Evening star mirror
    if first.is_bullish() && third.is_bearish() && third.close < first_mid {
        return Some(star_pattern(PatternKind::EveningStar, first, middle, third));
    }

    None
}

fn star_pattern(
    kind: PatternKind,
    first: &Candle,
    middle: &Candle,
    third: &Candle,
) -> ChartPattern {
    ChartPattern {
        kind,
        confidence: 0.8,
        start_time: first.timestamp,
        end_time: third.timestamp,
        key_points: vec![
            key_point(first, PointKind::Breakout),
            key_point(middle, PointKind::Breakout),
            key_point(third, PointKind::Breakout),
        ],
        description: format!(
            "{}: three-bar reversal closing at {:.2}",
            kind.label(),
            third.close
        ),
        target: None,
        stop_loss: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts, open, high, low, close, 1000.0)
    }

    #[test]
    fn test_hammer() {
        // Body 1, lower shadow 5, no upper shadow
        let c = candle(0, 100.0, 101.0, 95.0, 101.0);
        let found = detect_candlesticks(&[c]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PatternKind::Hammer);
        assert!(found[0].is_bullish());
        assert_eq!(found[0].confidence, 0.6);
    }

    #[test]
    fn test_shooting_star() {
        let c = candle(0, 101.0, 106.0, 100.0, 100.0);
        let found = detect_candlesticks(&[c]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PatternKind::ShootingStar);
        assert!(!found[0].is_bullish());
    }

    #[test]
    fn test_doji() {
        let c = candle(0, 100.0, 105.0, 95.0, 100.4);
        let found = detect_candlesticks(&[c]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PatternKind::Doji);
        assert_eq!(found[0].confidence, 0.5);
    }

    #[test]
    fn test_bullish_engulfing() {
        let prev = candle(0, 110.0, 110.5, 99.5, 100.0);
        let cur = candle(1, 99.0, 111.5, 98.5, 111.0);
        let found = detect_candlesticks(&[prev, cur]);
        let engulf: Vec<_> = found
            .iter()
            .filter(|p| p.kind == PatternKind::BullishEngulfing)
            .collect();
        assert_eq!(engulf.len(), 1);
        assert!(engulf[0].is_bullish());
        assert_eq!(engulf[0].confidence, 0.7);
    }

    #[test]
    fn test_bearish_engulfing() {
        let prev = candle(0, 100.0, 110.5, 99.5, 110.0);
        let cur = candle(1, 111.0, 111.5, 98.0, 99.0);
        let found = detect_candlesticks(&[prev, cur]);
        let engulf: Vec<_> = found
            .iter()
            .filter(|p| p.kind == PatternKind::BearishEngulfing)
            .collect();
        assert_eq!(engulf.len(), 1);
        assert!(!engulf[0].is_bullish());
    }

    #[test]
    fn test_morning_star() {
        let first = candle(0, 110.0, 110.5, 99.5, 100.0); // strong down
        let middle = candle(1, 99.5, 100.5, 98.5, 100.0); // small body
        let third = candle(2, 100.5, 109.5, 100.0, 109.0); // reclaims past midpoint 105
        let found = detect_candlesticks(&[first, middle, third]);
        let stars: Vec<_> = found
            .iter()
            .filter(|p| p.kind == PatternKind::MorningStar)
            .collect();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].confidence, 0.8);
        assert_eq!(stars[0].key_points.len(), 3);
    }

    #[test]
    fn test_evening_star() {
        let first = candle(0, 100.0, 110.5, 99.5, 110.0);
        let middle = candle(1, 110.5, 111.5, 109.5, 110.2);
        let third = candle(2, 109.5, 110.0, 100.0, 100.5); // below midpoint 105
        let found = detect_candlesticks(&[first, middle, third]);
        assert!(found.iter().any(|p| p.kind == PatternKind::EveningStar));
    }

    #[test]
    fn test_flat_candles_report_nothing() {
        let candles: Vec<Candle> = (0..30).map(|i| candle(i, 100.0, 100.0, 100.0, 100.0)).collect();
        assert!(detect_candlesticks(&candles).is_empty());
    }
}
