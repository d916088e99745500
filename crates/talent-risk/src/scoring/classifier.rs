use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical five-level risk taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    Elevated,
    High,
    Critical,
}

/// Lower bounds, evaluated from the highest band down.
const BANDS: [(u8, RiskLevel); 4] = [
    (75, RiskLevel::Critical),
    (60, RiskLevel::High),
    (45, RiskLevel::Elevated),
    (30, RiskLevel::Moderate),
];

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::Elevated,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn from_score(score: u8) -> Self {
        BANDS
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map(|(_, level)| *level)
            .unwrap_or(RiskLevel::Low)
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::Elevated => "ELEVATED",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// `HIGH` and above count toward high-risk rollups.
    pub fn is_high_risk(self) -> bool {
        self >= RiskLevel::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a recognised risk level")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    /// Accepts canonical names and the legacy labels stored by older records.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "minimal" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Moderate),
            "elevated" => Ok(RiskLevel::Elevated),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(UnknownRiskLevel(value.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
