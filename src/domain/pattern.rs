use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a price extremum or structural point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Peak,
    Trough,
    Support,
    Resistance,
    Breakout,
}

/// A local extremum relative to its immediate neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub timestamp: i64,
    pub price: f64,
    pub kind: PointKind,
}

impl PivotPoint {
    pub fn new(timestamp: i64, price: f64, kind: PointKind) -> Self {
        Self {
            timestamp,
            price,
            kind,
        }
    }
}

/// Every recognizable chart and candlestick formation. Direction and
/// reversal/continuation character are fixed attributes of the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HeadAndShoulders,
    InverseHeadAndShoulders,
    DoubleTop,
    DoubleBottom,
    TripleTop,
    TripleBottom,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    RisingWedge,
    FallingWedge,
    Rectangle,
    Hammer,
    ShootingStar,
    Doji,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
}

impl PatternKind {
    pub fn is_bullish(&self) -> bool {
        match self {
            PatternKind::InverseHeadAndShoulders
            | PatternKind::DoubleBottom
            | PatternKind::TripleBottom
            | PatternKind::AscendingTriangle
            | PatternKind::FallingWedge
            | PatternKind::Hammer
            | PatternKind::BullishEngulfing
            | PatternKind::MorningStar => true,
            PatternKind::HeadAndShoulders
            | PatternKind::DoubleTop
            | PatternKind::TripleTop
            | PatternKind::DescendingTriangle
            | PatternKind::RisingWedge
            | PatternKind::ShootingStar
            | PatternKind::BearishEngulfing
            | PatternKind::EveningStar => false,
            // Direction decided by the eventual breakout
            PatternKind::SymmetricalTriangle | PatternKind::Rectangle | PatternKind::Doji => false,
        }
    }

    pub fn is_reversal(&self) -> bool {
        match self {
            PatternKind::HeadAndShoulders
            | PatternKind::InverseHeadAndShoulders
            | PatternKind::DoubleTop
            | PatternKind::DoubleBottom
            | PatternKind::TripleTop
            | PatternKind::TripleBottom
            | PatternKind::Hammer
            | PatternKind::ShootingStar
            | PatternKind::BullishEngulfing
            | PatternKind::BearishEngulfing
            | PatternKind::MorningStar
            | PatternKind::EveningStar => true,
            PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::SymmetricalTriangle
            | PatternKind::RisingWedge
            | PatternKind::FallingWedge
            | PatternKind::Rectangle
            | PatternKind::Doji => false,
        }
    }

    /// Minimum number of key points a detection of this kind must report.
    pub fn min_key_points(&self) -> usize {
        match self {
            PatternKind::HeadAndShoulders | PatternKind::InverseHeadAndShoulders => 3,
            PatternKind::DoubleTop | PatternKind::DoubleBottom => 2,
            PatternKind::TripleTop | PatternKind::TripleBottom => 3,
            PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::SymmetricalTriangle
            | PatternKind::RisingWedge
            | PatternKind::FallingWedge => 4,
            PatternKind::Rectangle => 6,
            PatternKind::Hammer | PatternKind::ShootingStar | PatternKind::Doji => 1,
            PatternKind::BullishEngulfing | PatternKind::BearishEngulfing => 2,
            PatternKind::MorningStar | PatternKind::EveningStar => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "Head and Shoulders",
            PatternKind::InverseHeadAndShoulders => "Inverse Head and Shoulders",
            PatternKind::DoubleTop => "Double Top",
            PatternKind::DoubleBottom => "Double Bottom",
            PatternKind::TripleTop => "Triple Top",
            PatternKind::TripleBottom => "Triple Bottom",
            PatternKind::AscendingTriangle => "Ascending Triangle",
            PatternKind::DescendingTriangle => "Descending Triangle",
            PatternKind::SymmetricalTriangle => "Symmetrical Triangle",
            PatternKind::RisingWedge => "Rising Wedge",
            PatternKind::FallingWedge => "Falling Wedge",
            PatternKind::Rectangle => "Rectangle",
            PatternKind::Hammer => "Hammer",
            PatternKind::ShootingStar => "Shooting Star",
            PatternKind::Doji => "Doji",
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
            PatternKind::MorningStar => "Morning Star",
            PatternKind::EveningStar => "Evening Star",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A detected formation with its confidence and trade geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPattern {
    pub kind: PatternKind,
    pub confidence: f64,
    pub start_time: i64,
    pub end_time: i64,
    pub key_points: Vec<PivotPoint>,
    pub description: String,
    pub target: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl ChartPattern {
    pub fn is_bullish(&self) -> bool {
        self.kind.is_bullish()
    }

    pub fn is_reversal(&self) -> bool {
        self.kind.is_reversal()
    }
}
