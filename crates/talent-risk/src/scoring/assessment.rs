use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calculators::Dimension;
use super::classifier::RiskLevel;
use super::domain::EmployeeId;

/// Immutable result of scoring one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub employee_id: EmployeeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub algorithm_used: String,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub factors: BTreeMap<Dimension, f64>,
    pub confidence: u8,
    pub flags: BTreeSet<String>,
    pub recommendations: Vec<String>,
    pub insights: Vec<Insight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnalysis>,
    pub triggered_rules: Vec<String>,
    pub modifier_log: Vec<AppliedAdjustment>,
    pub timestamp: DateTime<Utc>,
}

/// The timestamp is metadata and does not take part in equality.
impl PartialEq for RiskAssessment {
    fn eq(&self, other: &Self) -> bool {
        self.employee_id == other.employee_id
            && self.department == other.department
            && self.algorithm_used == other.algorithm_used
            && self.score == other.score
            && self.risk_level == other.risk_level
            && self.factors == other.factors
            && self.confidence == other.confidence
            && self.flags == other.flags
            && self.recommendations == other.recommendations
            && self.insights == other.insights
            && self.trend == other.trend
            && self.triggered_rules == other.triggered_rules
            && self.modifier_log == other.modifier_log
    }
}

impl RiskAssessment {
    pub fn factor(&self, dimension: Dimension) -> Option<f64> {
        self.factors.get(&dimension).copied()
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    Critical,
    Warning,
    Info,
    Positive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub level: InsightLevel,
    pub message: String,
}

impl Insight {
    pub(crate) fn new(level: InsightLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    IncreasingRapidly,
    Increasing,
    Stable,
    Decreasing,
    DecreasingRapidly,
}

impl TrendDirection {
    pub fn from_change(change: f64) -> Self {
        if change > 10.0 {
            TrendDirection::IncreasingRapidly
        } else if change > 5.0 {
            TrendDirection::Increasing
        } else if change < -10.0 {
            TrendDirection::DecreasingRapidly
        } else if change < -5.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    pub fn is_rising(self) -> bool {
        matches!(
            self,
            TrendDirection::Increasing | TrendDirection::IncreasingRapidly
        )
    }

    pub fn is_falling(self) -> bool {
        matches!(
            self,
            TrendDirection::Decreasing | TrendDirection::DecreasingRapidly
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Current score minus the mean of the last three historical scores.
    pub change: f64,
    pub confidence: u8,
    pub historical_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Multiplier,
    Additive,
}

/// One entry in the audit trail of post-aggregation adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub name: String,
    pub kind: AdjustmentKind,
    pub value: f64,
}

impl AppliedAdjustment {
    pub(crate) fn multiplier(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: AdjustmentKind::Multiplier,
            value,
        }
    }

    pub(crate) fn additive(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: AdjustmentKind::Additive,
            value,
        }
    }
}
