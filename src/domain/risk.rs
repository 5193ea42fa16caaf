use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller risk appetite. Selects the minimum confidence a detected pattern
/// must carry before it is allowed to influence the aggregate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskLevel {
    pub fn signal_threshold(&self) -> f64 {
        match self {
            RiskLevel::Conservative => 0.8,
            RiskLevel::Moderate => 0.6,
            RiskLevel::Aggressive => 0.4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Conservative => "conservative",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Aggressive => "aggressive",
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Moderate
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "conservative" | "low" => Ok(RiskLevel::Conservative),
            "moderate" | "medium" => Ok(RiskLevel::Moderate),
            "aggressive" | "high" => Ok(RiskLevel::Aggressive),
            _ => Err(anyhow!(
                "Invalid risk level: '{}'. Valid options: conservative, moderate, aggressive",
                s
            )),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
