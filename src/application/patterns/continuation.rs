use super::pivots::Pivot;
use crate::domain::pattern::{ChartPattern, PatternKind};

/// Triangles, wedges and rectangles from the most recent pivot structure.
pub(crate) fn detect_continuations(pivots: &[Pivot], tolerance: f64) -> Vec<ChartPattern> {
    let peaks: Vec<&Pivot> = pivots.iter().filter(|p| p.is_peak()).collect();
    let troughs: Vec<&Pivot> = pivots.iter().filter(|p| p.is_trough()).collect();

    let mut out = Vec::new();

    if let Some(p) = detect_rectangle(&peaks, &troughs, tolerance) {
        out.push(p);
    }
    if peaks.len() >= 2 && troughs.len() >= 2 {
        // Work from the most recent structure: up to the last three of each
        let recent_peaks = tail(&peaks, 3);
        let recent_troughs = tail(&troughs, 3);
        if let Some(p) = detect_triangle(&recent_peaks, &recent_troughs, tolerance) {
            out.push(p);
        } else if let Some(p) = detect_wedge(&recent_peaks, &recent_troughs) {
            out.push(p);
        }
    }
    out
}

fn tail<'a>(pivots: &[&'a Pivot], n: usize) -> Vec<&'a Pivot> {
    pivots[pivots.len().saturating_sub(n)..].to_vec()
}

fn prices(pivots: &[&Pivot]) -> Vec<f64> {
    pivots.iter().map(|p| p.price).collect()
}

fn spread_ratio(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        f64::MAX
    } else {
        (max - min) / mean
    }
}

fn ascending(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

fn descending(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] < w[0])
}

fn span(points: &[&Pivot]) -> (i64, i64) {
    let start = points.iter().map(|p| p.timestamp).min().unwrap_or(0);
    let end = points.iter().map(|p| p.timestamp).max().unwrap_or(0);
    (start, end)
}

fn detect_triangle(
    peaks: &[&Pivot],
    troughs: &[&Pivot],
    tolerance: f64,
) -> Option<ChartPattern> {
    let peak_prices = prices(peaks);
    let trough_prices = prices(troughs);

    let flat_peaks = spread_ratio(&peak_prices) <= tolerance;
    let flat_troughs = spread_ratio(&trough_prices) <= tolerance;
    let rising_troughs = ascending(&trough_prices);
    let falling_peaks = descending(&peak_prices);

    let all: Vec<&Pivot> = peaks.iter().chain(troughs.iter()).cloned().collect();
    let (start, end) = span(&all);
    let key_points: Vec<_> = all.iter().map(|p| p.to_point()).collect();

    if flat_peaks && rising_troughs {
        let line = peak_prices.iter().sum::<f64>() / peak_prices.len() as f64;
        return Some(ChartPattern {
            kind: PatternKind::AscendingTriangle,
            confidence: 0.7,
            start_time: start,
            end_time: end,
            key_points,
            description: format!(
                "Ascending triangle pressing a flat ceiling at {:.2}",
                line
            ),
            target: Some(line * 1.05),
            stop_loss: None,
        });
    }

    if flat_troughs && falling_peaks {
        let line = trough_prices.iter().sum::<f64>() / trough_prices.len() as f64;
        return Some(ChartPattern {
            kind: PatternKind::DescendingTriangle,
            confidence: 0.7,
            start_time: start,
            end_time: end,
            key_points,
            description: format!(
                "Descending triangle leaning on a flat floor at {:.2}",
                line
            ),
            target: Some(line * 0.95),
            stop_loss: None,
        });
    }

    if falling_peaks && rising_troughs {
        let initial_range = peak_prices.first()? - trough_prices.first()?;
        let final_range = peak_prices.last()? - trough_prices.last()?;
        if initial_range > 0.0 && final_range / initial_range <= 0.7 {
            // Breakout side unknown; project half the opening range from
            // the apex midpoint
            let mid = (peak_prices.last()? + trough_prices.last()?) / 2.0;
            return Some(ChartPattern {
                kind: PatternKind::SymmetricalTriangle,
                confidence: 0.65,
                start_time: start,
                end_time: end,
                key_points,
                description: format!(
                    "Symmetrical triangle compressing from {:.2} to {:.2}",
                    initial_range, final_range
                ),
                target: Some(mid + 0.5 * initial_range),
                stop_loss: None,
            });
        }
    }

    None
}

fn detect_wedge(peaks: &[&Pivot], troughs: &[&Pivot]) -> Option<ChartPattern> {
    let peak_prices = prices(peaks);
    let trough_prices = prices(troughs);

    let initial_range = peak_prices.first()? - trough_prices.first()?;
    let final_range = peak_prices.last()? - trough_prices.last()?;
    let narrowing = initial_range > 0.0 && final_range < initial_range;
    if !narrowing {
        return None;
    }

    let all: Vec<&Pivot> = peaks.iter().chain(troughs.iter()).cloned().collect();
    let (start, end) = span(&all);
    let key_points: Vec<_> = all.iter().map(|p| p.to_point()).collect();

    if ascending(&peak_prices) && ascending(&trough_prices) {
        return Some(ChartPattern {
            kind: PatternKind::RisingWedge,
            confidence: 0.6,
            start_time: start,
            end_time: end,
            key_points,
            description: "Rising wedge: both boundaries climb while the range narrows"
                .to_string(),
            target: None,
            stop_loss: None,
        });
    }

    if descending(&peak_prices) && descending(&trough_prices) {
        return Some(ChartPattern {
            kind: PatternKind::FallingWedge,
            confidence: 0.6,
            start_time: start,
            end_time: end,
            key_points,
            description: "Falling wedge: both boundaries fall while the range narrows"
                .to_string(),
            target: None,
            stop_loss: None,
        });
    }

    None
}

fn detect_rectangle(
    peaks: &[&Pivot],
    troughs: &[&Pivot],
    tolerance: f64,
) -> Option<ChartPattern> {
    if peaks.len() < 3 || troughs.len() < 3 {
        return None;
    }

    let peak_prices = prices(peaks);
    let trough_prices = prices(troughs);
    if spread_ratio(&peak_prices) > tolerance || spread_ratio(&trough_prices) > tolerance {
        return None;
    }

    let resistance = peak_prices.iter().sum::<f64>() / peak_prices.len() as f64;
    let support = trough_prices.iter().sum::<f64>() / trough_prices.len() as f64;

    let all: Vec<&Pivot> = peaks.iter().chain(troughs.iter()).cloned().collect();
    let (start, end) = span(&all);

    Some(ChartPattern {
        kind: PatternKind::Rectangle,
        confidence: 0.65,
        start_time: start,
        end_time: end,
        key_points: all.iter().map(|p| p.to_point()).collect(),
        description: format!(
            "Rectangle between support {:.2} and resistance {:.2}",
            support, resistance
        ),
        target: Some(resistance + (resistance - support)),
        stop_loss: None,
    })
}
