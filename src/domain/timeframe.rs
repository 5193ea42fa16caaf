use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval used for historical analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    FourHour,
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::FourHour => 240,
            Timeframe::Daily => 1440,
            Timeframe::Weekly => 10080,
            Timeframe::Monthly => 43200,
        }
    }

    pub fn seconds(&self) -> i64 {
        self.minutes() as i64 * 60
    }

    /// Converts to the CoinPaprika OHLCV interval string. The 4h interval
    /// is only served on paid tiers; the free tier answers it with 402.
    pub fn to_paprika_interval(&self) -> &'static str {
        match self {
            Timeframe::FourHour => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "7d",
            Timeframe::Monthly => "30d",
        }
    }

    /// All timeframes in ascending order, used for multi-timeframe fan-out.
    pub fn all() -> [Timeframe; 4] {
        [
            Timeframe::FourHour,
            Timeframe::Daily,
            Timeframe::Weekly,
            Timeframe::Monthly,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::FourHour => "4h",
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Daily
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "4h" | "4hour" | "fourhour" => Ok(Timeframe::FourHour),
            "1d" | "daily" | "day" => Ok(Timeframe::Daily),
            "1w" | "weekly" | "week" => Ok(Timeframe::Weekly),
            "1m" | "monthly" | "month" => Ok(Timeframe::Monthly),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: 4h, daily, weekly, monthly",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
