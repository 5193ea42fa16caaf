use super::pivots::{relative_diff, Pivot};
use crate::domain::pattern::{ChartPattern, PatternKind, PointKind};

/// Head & shoulders and its inverse: three consecutive same-side pivots
/// with a strictly more extreme middle, outer pair within tolerance, and a
/// neckline drawn through at least two opposite pivots between them.
pub(crate) fn detect_head_and_shoulders(pivots: &[Pivot], tolerance: f64) -> Vec<ChartPattern> {
    let mut out = Vec::new();
    out.extend(scan_hs(pivots, tolerance, true));
    out.extend(scan_hs(pivots, tolerance, false));
    out
}

fn scan_hs(pivots: &[Pivot], tolerance: f64, tops: bool) -> Vec<ChartPattern> {
    let sided: Vec<&Pivot> = pivots
        .iter()
        .filter(|p| if tops { p.is_peak() } else { p.is_trough() })
        .collect();

    let mut out = Vec::new();

    for w in sided.windows(3) {
        let (left, head, right) = (w[0], w[1], w[2]);

        let head_extreme = if tops {
            head.price > left.price && head.price > right.price
        } else {
            head.price < left.price && head.price < right.price
        };
        if !head_extreme {
            continue;
        }

        let shoulder_diff = relative_diff(left.price, right.price);
        if shoulder_diff > tolerance {
            continue;
        }

        // Neckline from opposite pivots strictly between the shoulders
        let neck: Vec<&Pivot> = pivots
            .iter()
            .filter(|p| {
                p.index > left.index
                    && p.index < right.index
                    && (if tops { p.is_trough() } else { p.is_peak() })
            })
            .collect();
        if neck.len() < 2 {
            continue;
        }

        let neckline = neck.iter().map(|p| p.price).sum::<f64>() / neck.len() as f64;
        let neck_prices: Vec<f64> = neck.iter().map(|p| p.price).collect();
        let neck_spread = neck_prices.iter().cloned().fold(f64::MIN, f64::max)
            - neck_prices.iter().cloned().fold(f64::MAX, f64::min);
        let neck_consistency = (tolerance - neck_spread / neckline).max(0.0);

        let shoulder_mean = (left.price + right.price) / 2.0;
        let prominence = relative_diff(head.price, shoulder_mean);

        let confidence = (0.5
            + (tolerance - shoulder_diff).max(0.0) * 10.0
            + prominence * 5.0
            + neck_consistency * 5.0)
            .min(1.0);

        let height = (head.price - neckline).abs();
        let (kind, target) = if tops {
            (PatternKind::HeadAndShoulders, neckline - height)
        } else {
            (PatternKind::InverseHeadAndShoulders, neckline + height)
        };

        let mut key_points = vec![left.to_point(), head.to_point(), right.to_point()];
        key_points.extend(neck.iter().map(|p| {
            let mut point = p.to_point();
            point.kind = if tops {
                PointKind::Support
            } else {
                PointKind::Resistance
            };
            point
        }));

        out.push(ChartPattern {
            kind,
            confidence,
            start_time: left.timestamp,
            end_time: right.timestamp,
            key_points,
            description: format!(
                "{} with head at {:.2} and neckline at {:.2}",
                kind.label(),
                head.price,
                neckline
            ),
            target: Some(target),
            stop_loss: Some(head.price),
        });
    }
    out
}

/// Double and triple tops/bottoms: same-side pivots within tolerance with
/// intermediate opposite pivots between the extremes.
pub(crate) fn detect_double_triple(pivots: &[Pivot], tolerance: f64) -> Vec<ChartPattern> {
    let mut out = Vec::new();
    for tops in [true, false] {
        out.extend(scan_multiple(pivots, tolerance, tops, 3));
        out.extend(scan_multiple(pivots, tolerance, tops, 2));
    }
    out
}

fn scan_multiple(pivots: &[Pivot], tolerance: f64, tops: bool, count: usize) -> Vec<ChartPattern> {
    let sided: Vec<&Pivot> = pivots
        .iter()
        .filter(|p| if tops { p.is_peak() } else { p.is_trough() })
        .collect();

    let mut out = Vec::new();

    for w in sided.windows(count) {
        let prices: Vec<f64> = w.iter().map(|p| p.price).collect();
        let mean = prices.iter().sum::<f64>() / count as f64;
        let spread = prices.iter().cloned().fold(f64::MIN, f64::max)
            - prices.iter().cloned().fold(f64::MAX, f64::min);
        let variance = spread / mean;
        if variance > tolerance {
            continue;
        }

        let (first, last) = (w[0], w[count - 1]);
        let between: Vec<&Pivot> = pivots
            .iter()
            .filter(|p| {
                p.index > first.index
                    && p.index < last.index
                    && (if tops { p.is_trough() } else { p.is_peak() })
            })
            .collect();
        if between.len() < count - 1 {
            continue;
        }

        // Breakout line through the intermediate pivots
        let breakout = if tops {
            between.iter().map(|p| p.price).fold(f64::MAX, f64::min)
        } else {
            between.iter().map(|p| p.price).fold(f64::MIN, f64::max)
        };
        let height = (mean - breakout).abs();
        let depth = height / mean;

        let target = if tops {
            breakout - height
        } else {
            breakout + height
        };

        let kind = match (tops, count) {
            (true, 2) => PatternKind::DoubleTop,
            (false, 2) => PatternKind::DoubleBottom,
            (true, _) => PatternKind::TripleTop,
            (false, _) => PatternKind::TripleBottom,
        };

        let confidence = (0.5 + (tolerance - variance).max(0.0) * 15.0 + depth * 5.0).min(1.0);

        let mut key_points: Vec<_> = w.iter().map(|p| p.to_point()).collect();
        key_points.extend(between.iter().map(|p| p.to_point()));

        out.push(ChartPattern {
            kind,
            confidence,
            start_time: first.timestamp,
            end_time: last.timestamp,
            key_points,
            description: format!(
                "{} around {:.2} with breakout line at {:.2}",
                kind.label(),
                mean,
                breakout
            ),
            target: Some(target),
            stop_loss: Some(if tops {
                prices.iter().cloned().fold(f64::MIN, f64::max)
            } else {
                prices.iter().cloned().fold(f64::MAX, f64::min)
            }),
        });
    }
    out
}
