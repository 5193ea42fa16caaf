use serde::{Deserialize, Serialize};
use std::fmt;

/// How a horizontal level was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
    Pivot,
    Fibonacci,
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKind::Support => write!(f, "support"),
            LevelKind::Resistance => write!(f, "resistance"),
            LevelKind::Pivot => write!(f, "pivot"),
            LevelKind::Fibonacci => write!(f, "fibonacci"),
        }
    }
}

/// A horizontal support/resistance level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    /// Strength in [0, 1], monotone in touch count and recency.
    pub strength: f64,
    pub kind: LevelKind,
    pub touches: u32,
    /// Timestamp of the most recent touch (unix seconds).
    pub last_touch: i64,
    /// Within 10% of the current price.
    pub is_active: bool,
}

/// A sloped level fitted through at least three pivots of one sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    /// Price change per bar index.
    pub slope: f64,
    /// Price at bar index 0.
    pub intercept: f64,
    pub kind: LevelKind,
    pub touches: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_kind_display() {
        assert_eq!(LevelKind::Support.to_string(), "support");
        assert_eq!(LevelKind::Resistance.to_string(), "resistance");
        assert_eq!(LevelKind::Fibonacci.to_string(), "fibonacci");
    }
}
