//! Support/resistance discovery.
//!
//! Four independent methods produce candidate levels: pivot clustering,
//! volume profiling, Fibonacci retracements and psychological round
//! numbers. Candidates are then consolidated by merging neighbors within
//! tolerance. Dynamic trend lines are fitted through pivot pairs.

use crate::application::patterns::{find_pivots, Pivot};
use crate::domain::candle::Candle;
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::level::{Level, LevelKind, TrendLine};

/// Minimum series length for level analysis.
const MIN_CANDLES: usize = 20;

const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

const VOLUME_BINS: usize = 50;
const VOLUME_TOP_BINS: usize = 10;

const SECS_PER_DAY: i64 = 86_400;

/// Complete level picture for one candle series.
#[derive(Debug, Clone)]
pub struct LevelAnalysis {
    pub levels: Vec<Level>,
    pub trend_lines: Vec<TrendLine>,
}

impl LevelAnalysis {
    /// Nearest level strictly below the given price.
    pub fn nearest_below(&self, price: f64) -> Option<&Level> {
        self.levels
            .iter()
            .filter(|l| l.price < price)
            .max_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Nearest level strictly above the given price.
    pub fn nearest_above(&self, price: f64) -> Option<&Level> {
        self.levels
            .iter()
            .filter(|l| l.price > price)
            .min_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[derive(Debug, Clone)]
pub struct LevelAnalyzer {
    tolerance: f64,
}

impl Default for LevelAnalyzer {
    fn default() -> Self {
        Self { tolerance: 0.02 }
    }
}

impl LevelAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all four methods and consolidate. `now` drives the recency
    /// bonus; `current_price` classifies levels and sets the active flag.
    pub fn analyze(
        &self,
        candles: &[Candle],
        current_price: f64,
        now: i64,
    ) -> AnalysisResult<LevelAnalysis> {
        if candles.len() < MIN_CANDLES {
            return Err(AnalysisError::InsufficientData(format!(
                "level analysis needs at least {} candles, got {}",
                MIN_CANDLES,
                candles.len()
            )));
        }

        let mut levels = Vec::new();
        levels.extend(self.pivot_levels(candles, current_price, now));
        levels.extend(self.volume_levels(candles));
        levels.extend(self.fibonacci_levels(candles));
        levels.extend(self.psychological_levels(candles, current_price));

        for level in &mut levels {
            level.is_active = (level.price - current_price).abs() <= 0.1 * current_price;
        }

        let levels = self.consolidate(levels, current_price);
        let trend_lines = self.trend_lines(candles);

        Ok(LevelAnalysis {
            levels,
            trend_lines,
        })
    }

    /// Cluster pivot prices within tolerance; clusters touched at least
    /// twice become levels.
    fn pivot_levels(&self, candles: &[Candle], current_price: f64, now: i64) -> Vec<Level> {
        let pivots = find_pivots(candles);
        if pivots.is_empty() {
            return Vec::new();
        }

        let mut sorted: Vec<&Pivot> = pivots.iter().collect();
        sorted.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

        let mut out = Vec::new();
        let mut cluster: Vec<&Pivot> = vec![sorted[0]];

        for pivot in sorted.into_iter().skip(1) {
            let mean = cluster.iter().map(|p| p.price).sum::<f64>() / cluster.len() as f64;
            if (pivot.price - mean).abs() <= mean * self.tolerance {
                cluster.push(pivot);
            } else {
                if let Some(level) = self.cluster_to_level(&cluster, current_price, now) {
                    out.push(level);
                }
                cluster = vec![pivot];
            }
        }
        if let Some(level) = self.cluster_to_level(&cluster, current_price, now) {
            out.push(level);
        }
        out
    }

    fn cluster_to_level(&self, cluster: &[&Pivot], current_price: f64, now: i64) -> Option<Level> {
        if cluster.len() < 2 {
            return None;
        }

        let price = cluster.iter().map(|p| p.price).sum::<f64>() / cluster.len() as f64;
        let touches = cluster.len() as u32;
        let last_touch = cluster.iter().map(|p| p.timestamp).max().unwrap_or(0);

        let base = (touches as f64 * 0.1).min(0.5);
        let strength = (base + recency_bonus(last_touch, now) + touch_bonus(touches)).min(1.0);

        Some(Level {
            price,
            strength,
            kind: if price < current_price {
                LevelKind::Support
            } else {
                LevelKind::Resistance
            },
            touches,
            last_touch,
            is_active: false,
        })
    }

    /// Bucket the price range into equal-width bins, pour each candle's
    /// volume into its typical-price bin, and keep the heaviest bins that
    /// the series actually touched twice.
    fn volume_levels(&self, candles: &[Candle]) -> Vec<Level> {
        let min = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let max = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        if max <= min {
            return Vec::new();
        }

        let width = (max - min) / VOLUME_BINS as f64;
        let mut bins = vec![0.0f64; VOLUME_BINS];
        let mut total = 0.0;

        for candle in candles {
            let idx = (((candle.typical_price() - min) / width) as usize).min(VOLUME_BINS - 1);
            bins[idx] += candle.volume;
            total += candle.volume;
        }
        if total <= 0.0 {
            return Vec::new();
        }

        let mut ranked: Vec<(usize, f64)> = bins
            .iter()
            .cloned()
            .enumerate()
            .filter(|(_, v)| *v > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut out = Vec::new();
        for (idx, volume) in ranked.into_iter().take(VOLUME_TOP_BINS) {
            let price = min + (idx as f64 + 0.5) * width;
            let (touches, last_touch) = self.touch_stats(candles, price);
            if touches < 2 {
                continue;
            }
            out.push(Level {
                price,
                strength: (10.0 * volume / total).min(1.0),
                kind: LevelKind::Pivot,
                touches,
                last_touch,
                is_active: false,
            });
        }
        out
    }

    fn fibonacci_levels(&self, candles: &[Candle]) -> Vec<Level> {
        let min = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let max = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        if max <= min {
            return Vec::new();
        }

        let mut out = Vec::new();
        for ratio in FIB_RATIOS {
            let price = min + ratio * (max - min);
            let (touches, last_touch) = self.touch_stats(candles, price);
            if touches < 1 {
                continue;
            }
            out.push(Level {
                price,
                strength: (0.5 + touch_bonus(touches)).min(1.0),
                kind: LevelKind::Fibonacci,
                touches,
                last_touch,
                is_active: false,
            });
        }
        out
    }

    /// Round-number grid whose step follows the price magnitude.
    fn psychological_levels(&self, candles: &[Candle], current_price: f64) -> Vec<Level> {
        let step = psychological_step(current_price);
        let min = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let max = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        if max <= min {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut price = (min / step).ceil() * step;
        while price <= max {
            let (touches, last_touch) = self.touch_stats(candles, price);
            if touches >= 1 {
                out.push(Level {
                    price,
                    strength: (0.4 + touch_bonus(touches)).min(1.0),
                    kind: if price < current_price {
                        LevelKind::Support
                    } else {
                        LevelKind::Resistance
                    },
                    touches,
                    last_touch,
                    is_active: false,
                });
            }
            price += step;
        }
        out
    }

    /// A bar touches a price when its high or low lands within tolerance,
    /// or its range straddles the price outright.
    fn touch_stats(&self, candles: &[Candle], price: f64) -> (u32, i64) {
        let tol = price * self.tolerance;
        let mut touches = 0;
        let mut last_touch = 0;
        for candle in candles {
            let touched = (candle.high - price).abs() <= tol
                || (candle.low - price).abs() <= tol
                || (candle.low <= price && candle.high >= price);
            if touched {
                touches += 1;
                last_touch = last_touch.max(candle.timestamp);
            }
        }
        (touches, last_touch)
    }

    /// Merge neighbors within tolerance. The merged level takes the mean
    /// price, the summed touches, the freshest touch, and the strongest
    /// member's score bumped per absorbed member.
    fn consolidate(&self, mut levels: Vec<Level>, current_price: f64) -> Vec<Level> {
        if levels.is_empty() {
            return levels;
        }

        levels.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

        let mut out: Vec<Level> = Vec::new();
        let mut group: Vec<Level> = vec![levels[0].clone()];

        for level in levels.into_iter().skip(1) {
            let mean = group.iter().map(|l| l.price).sum::<f64>() / group.len() as f64;
            if (level.price - mean).abs() <= mean * self.tolerance {
                group.push(level);
            } else {
                out.push(merge_group(&group, current_price));
                group = vec![level];
            }
        }
        out.push(merge_group(&group, current_price));
        out
    }

    /// Fit lines through every same-sign pivot pair; keep lines that at
    /// least three pivots ride within tolerance.
    fn trend_lines(&self, candles: &[Candle]) -> Vec<TrendLine> {
        let pivots = find_pivots(candles);
        let peaks: Vec<&Pivot> = pivots.iter().filter(|p| p.is_peak()).collect();
        let troughs: Vec<&Pivot> = pivots.iter().filter(|p| p.is_trough()).collect();

        let mut out = Vec::new();
        out.extend(self.fit_lines(&peaks, LevelKind::Resistance));
        out.extend(self.fit_lines(&troughs, LevelKind::Support));
        out
    }

    fn fit_lines(&self, pivots: &[&Pivot], kind: LevelKind) -> Vec<TrendLine> {
        let mut out: Vec<TrendLine> = Vec::new();

        for i in 0..pivots.len() {
            for j in (i + 1)..pivots.len() {
                let (a, b) = (pivots[i], pivots[j]);
                if b.index == a.index {
                    continue;
                }
                let slope = (b.price - a.price) / (b.index as f64 - a.index as f64);
                let intercept = a.price - slope * a.index as f64;

                let touches = pivots
                    .iter()
                    .filter(|p| {
                        let line = slope * p.index as f64 + intercept;
                        (p.price - line).abs() <= p.price * self.tolerance
                    })
                    .count() as u32;

                if touches < 3 {
                    continue;
                }

                let duplicate = out.iter().any(|l| {
                    (l.slope - slope).abs() <= slope.abs().max(1e-9) * 0.05
                        && (l.intercept - intercept).abs() <= intercept.abs().max(1e-9) * 0.01
                });
                if !duplicate {
                    out.push(TrendLine {
                        slope,
                        intercept,
                        kind,
                        touches,
                    });
                }
            }
        }
        out
    }
}

fn merge_group(group: &[Level], current_price: f64) -> Level {
    let price = group.iter().map(|l| l.price).sum::<f64>() / group.len() as f64;
    let max_strength = group.iter().map(|l| l.strength).fold(0.0, f64::max);
    let strongest_kind = group
        .iter()
        .max_by(|a, b| a.strength.partial_cmp(&b.strength).unwrap_or(std::cmp::Ordering::Equal))
        .map(|l| l.kind)
        .unwrap_or(LevelKind::Pivot);

    Level {
        price,
        strength: (max_strength + (group.len() as f64 - 1.0) * 0.1).min(1.0),
        kind: match strongest_kind {
            LevelKind::Fibonacci => LevelKind::Fibonacci,
            LevelKind::Pivot => LevelKind::Pivot,
            _ => {
                if price < current_price {
                    LevelKind::Support
                } else {
                    LevelKind::Resistance
                }
            }
        },
        touches: group.iter().map(|l| l.touches).sum(),
        last_touch: group.iter().map(|l| l.last_touch).max().unwrap_or(0),
        is_active: group.iter().any(|l| l.is_active),
    }
}

fn recency_bonus(last_touch: i64, now: i64) -> f64 {
    let age_days = (now - last_touch) / SECS_PER_DAY;
    if age_days <= 7 {
        0.3
    } else if age_days <= 30 {
        0.2
    } else if age_days <= 90 {
        0.1
    } else {
        0.0
    }
}

fn touch_bonus(touches: u32) -> f64 {
    if touches >= 5 {
        0.2
    } else if touches >= 3 {
        0.1
    } else {
        0.0
    }
}

fn psychological_step(price: f64) -> f64 {
    if price < 1.0 {
        0.1
    } else if price < 10.0 {
        1.0
    } else if price < 100.0 {
        10.0
    } else if price < 1_000.0 {
        100.0
    } else if price < 10_000.0 {
        1_000.0
    } else {
        10_000.0
    }
}
