use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// Engine-wide tables. Deserializable so deployments can tune breakpoints without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringConfig {
    pub tables: CalculatorTables,
    /// Keys are matched case-insensitively; unknown departments use 1.0.
    pub department_multipliers: BTreeMap<String, f64>,
    pub critical_signal_bump: f64,
    pub trend_factor_limit: f64,
    pub selection: SelectionPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let department_multipliers = [
            ("Engineering", 1.10),
            ("Sales", 1.05),
            ("Finance", 0.90),
            ("HR", 0.95),
        ]
        .into_iter()
        .map(|(name, multiplier)| (name.to_string(), multiplier))
        .collect();

        Self {
            tables: CalculatorTables::default(),
            department_multipliers,
            critical_signal_bump: 20.0,
            trend_factor_limit: 0.5,
            selection: SelectionPolicy::default(),
        }
    }
}

impl ScoringConfig {
    pub fn department_multiplier(&self, department: Option<&str>) -> f64 {
        let Some(department) = department else {
            return 1.0;
        };

        self.department_multipliers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(department.trim()))
            .map(|(_, multiplier)| *multiplier)
            .unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.tables.validate()?;

        if let Some((name, value)) = self
            .department_multipliers
            .iter()
            .find(|(_, value)| !value.is_finite() || **value <= 0.0)
        {
            return Err(ConfigurationError::InvalidTable {
                table: "departmentMultipliers",
                reason: format!("multiplier for '{name}' must be positive, got {value}"),
            });
        }

        if !self.critical_signal_bump.is_finite() || self.critical_signal_bump < 0.0 {
            return Err(ConfigurationError::InvalidTable {
                table: "criticalSignalBump",
                reason: "must be a non-negative number".to_string(),
            });
        }

        if !self.trend_factor_limit.is_finite() || self.trend_factor_limit < 0.0 {
            return Err(ConfigurationError::InvalidTable {
                table: "trendFactorLimit",
                reason: "must be a non-negative number".to_string(),
            });
        }

        Ok(())
    }
}

/// Fallbacks used by the auto selector once department and role bindings miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectionPolicy {
    pub high_risk_threshold: u8,
    pub high_risk_algorithm: String,
    pub default_algorithm: String,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            high_risk_threshold: 60,
            high_risk_algorithm: "advanced".to_string(),
            default_algorithm: "basic".to_string(),
        }
    }
}

/// Half-open band: applies while the input is strictly below `below`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub below: f64,
    pub score: f64,
}

/// Cumulative step: adds `add` whenever the input exceeds `above`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub above: f64,
    pub add: f64,
}

pub(crate) fn band_score(bands: &[Band], value: f64, beyond: f64) -> f64 {
    bands
        .iter()
        .find(|band| value < band.below)
        .map(|band| band.score)
        .unwrap_or(beyond)
}

pub(crate) fn step_total(steps: &[Step], value: f64) -> f64 {
    steps
        .iter()
        .filter(|step| value > step.above)
        .map(|step| step.add)
        .sum()
}

fn band(below: f64, score: f64) -> Band {
    Band { below, score }
}

fn step(above: f64, add: f64) -> Step {
    Step { above, add }
}

fn keywords(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalculatorTables {
    /// Sub-score used whenever a dimension has no input at all.
    pub missing_score: f64,
    pub tenure: TenureTable,
    pub performance: PerformanceTable,
    pub engagement: EngagementTable,
    pub market: MarketTable,
    pub obsolescence: ObsolescenceTable,
    pub compensation: CompensationTable,
}

impl Default for CalculatorTables {
    fn default() -> Self {
        Self {
            missing_score: 50.0,
            tenure: TenureTable::default(),
            performance: PerformanceTable::default(),
            engagement: EngagementTable::default(),
            market: MarketTable::default(),
            obsolescence: ObsolescenceTable::default(),
            compensation: CompensationTable::default(),
        }
    }
}

impl CalculatorTables {
    fn validate(&self) -> Result<(), ConfigurationError> {
        check_bands("tenure.bands", &self.tenure.bands)?;
        check_bands("compensation.bands", &self.compensation.bands)?;
        check_score("missingScore", self.missing_score)?;
        check_score("tenure.beyond", self.tenure.beyond)?;
        check_score("compensation.beyond", self.compensation.beyond)?;
        check_score("performance.topPerformerFloor", self.performance.top_performer_floor)?;
        Ok(())
    }
}

fn check_score(table: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidTable {
            table,
            reason: format!("{value} is outside 0..=100"),
        })
    }
}

fn check_bands(table: &'static str, bands: &[Band]) -> Result<(), ConfigurationError> {
    for pair in bands.windows(2) {
        if pair[1].below <= pair[0].below {
            return Err(ConfigurationError::InvalidTable {
                table,
                reason: "band upper bounds must be strictly ascending".to_string(),
            });
        }
    }

    for entry in bands {
        check_score(table, entry.score)?;
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TenureTable {
    pub bands: Vec<Band>,
    /// Stagnation uptick for very long tenure.
    pub beyond: f64,
}

impl Default for TenureTable {
    fn default() -> Self {
        Self {
            bands: vec![
                band(6.0, 80.0),
                band(12.0, 55.0),
                band(36.0, 35.0),
                band(84.0, 15.0),
            ],
            beyond: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceTable {
    pub top_performer_floor: f64,
    /// Percentage at which an employee counts as a top performer for flags.
    pub top_performer_pct: f64,
}

impl Default for PerformanceTable {
    fn default() -> Self {
        Self {
            top_performer_floor: 12.0,
            top_performer_pct: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngagementTable {
    pub default_engagement: f64,
    pub promotion_steps: Vec<Step>,
    pub low_training_hours: f64,
    pub low_training_penalty: f64,
}

impl Default for EngagementTable {
    fn default() -> Self {
        Self {
            default_engagement: 50.0,
            promotion_steps: vec![step(24.0, 10.0), step(36.0, 15.0)],
            low_training_hours: 20.0,
            low_training_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketTable {
    pub default_demand: f64,
    pub demand_keywords: Vec<String>,
    pub per_skill_bonus: f64,
    pub specialized_bonus: f64,
    pub rare_bonus: f64,
    pub recruiter_steps: Vec<Step>,
    pub competitor_steps: Vec<Step>,
}

impl Default for MarketTable {
    fn default() -> Self {
        Self {
            default_demand: 40.0,
            demand_keywords: keywords(&[
                "machine learning",
                "artificial intelligence",
                "data science",
                "data analysis",
                "cloud",
                "kubernetes",
                "devops",
                "cybersecurity",
                "react",
                "node.js",
            ]),
            per_skill_bonus: 10.0,
            specialized_bonus: 15.0,
            rare_bonus: 25.0,
            recruiter_steps: vec![step(0.0, 15.0), step(2.0, 10.0)],
            competitor_steps: vec![step(0.0, 20.0), step(1.0, 10.0)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObsolescenceTable {
    pub base: f64,
    pub legacy_keywords: Vec<String>,
    pub per_legacy_bonus: f64,
    pub per_gap_bonus: f64,
    pub gap_bonus_cap: f64,
}

impl Default for ObsolescenceTable {
    fn default() -> Self {
        Self {
            base: 20.0,
            legacy_keywords: keywords(&[
                "cobol",
                "mainframe",
                "jquery",
                "php",
                "flash",
                "legacy systems",
                "manual testing",
                "waterfall",
            ]),
            per_legacy_bonus: 15.0,
            per_gap_bonus: 10.0,
            gap_bonus_cap: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompensationTable {
    pub bands: Vec<Band>,
    pub beyond: f64,
    pub raise_steps: Vec<Step>,
    /// Ratio below which the `underpaid` flag and insight fire.
    pub underpaid_ratio: f64,
}

impl Default for CompensationTable {
    fn default() -> Self {
        Self {
            bands: vec![
                band(0.7, 90.0),
                band(0.8, 70.0),
                band(0.9, 50.0),
                band(1.1, 20.0),
                band(1.3, 10.0),
            ],
            beyond: 5.0,
            raise_steps: vec![step(24.0, 15.0), step(36.0, 10.0)],
            underpaid_ratio: 0.85,
        }
    }
}
