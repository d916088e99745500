use chrono::{DateTime, Utc};
use tracing::debug;

use super::aggregation::aggregate;
use super::assessment::RiskAssessment;
use super::calculators::{ScoreInputs, TRACKED_INPUTS};
use super::classifier::RiskLevel;
use super::config::ScoringConfig;
use super::domain::{Employee, RiskFactors};
use super::error::ScoringError;
use super::insights;
use super::registry::{AlgorithmConfig, AlgorithmRegistry, AlgorithmSummary, CustomAlgorithmDefinition};

/// Stateless scorer over an immutable registry and table set.
///
/// Scoring takes `&self` and performs no I/O, so a single engine can be shared across
/// threads. Registration needs `&mut self`; services that register at runtime keep the
/// engine behind a copy-on-write handle.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: ScoringConfig,
    registry: AlgorithmRegistry,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self {
            config: ScoringConfig::default(),
            registry: AlgorithmRegistry::with_builtins(),
        }
    }
}

impl RiskEngine {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        Self::with_registry(config, AlgorithmRegistry::with_builtins())
    }

    pub fn with_registry(
        config: ScoringConfig,
        registry: AlgorithmRegistry,
    ) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn score(
        &self,
        employee: &Employee,
        factors: &RiskFactors,
        algorithm: Option<&str>,
    ) -> Result<RiskAssessment, ScoringError> {
        self.score_at(employee, factors, algorithm, Utc::now())
    }

    /// Scores with an explicit assessment time, used for reproducible runs.
    pub fn score_at(
        &self,
        employee: &Employee,
        factors: &RiskFactors,
        algorithm: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<RiskAssessment, ScoringError> {
        employee.validate()?;
        let selected = self.select_algorithm(algorithm, employee)?;
        Ok(self.assess_with(selected, employee, factors, now))
    }

    pub(crate) fn assess_with(
        &self,
        algorithm: &AlgorithmConfig,
        employee: &Employee,
        factors: &RiskFactors,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let as_of = factors.as_of.unwrap_or_else(|| now.date_naive());
        let inputs = ScoreInputs::new(employee, factors, as_of);
        let tables = &self.config.tables;

        let aggregation = aggregate(algorithm, &inputs, &self.config);
        let score = aggregation.score;
        let risk_level = RiskLevel::from_score(score);
        let trend = insights::trend_analysis(&factors.historical_scores, score);
        let flags = insights::flags(&aggregation.factors, &inputs, tables);
        let recommendations = insights::recommendations(score, &aggregation.factors);
        let insights = insights::insights(score, &aggregation.factors, trend.as_ref(), &inputs, tables);
        let confidence = confidence(inputs.present_inputs());

        debug!(
            employee_id = %employee.id,
            algorithm = %algorithm.name,
            score,
            level = %risk_level,
            "employee scored"
        );

        RiskAssessment {
            employee_id: employee.id.clone(),
            department: employee.department.clone(),
            algorithm_used: algorithm.name.clone(),
            score,
            risk_level,
            factors: aggregation.factors,
            confidence,
            flags,
            recommendations,
            insights,
            trend,
            triggered_rules: aggregation.triggered_rules,
            modifier_log: aggregation.modifier_log,
            timestamp: now,
        }
    }

    /// Resolves an explicit name, or auto-selects when `algorithm` is `None`, blank or `auto`.
    pub fn select_algorithm(
        &self,
        algorithm: Option<&str>,
        employee: &Employee,
    ) -> Result<&AlgorithmConfig, ScoringError> {
        self.registry
            .select(algorithm, employee, &self.config.selection)
    }

    /// Adds a validated custom algorithm. The registry is untouched on failure.
    pub fn register_algorithm(
        &mut self,
        definition: CustomAlgorithmDefinition,
    ) -> Result<AlgorithmSummary, ScoringError> {
        let config = self.registry.register(definition)?;
        Ok(config.summary())
    }

    pub fn list_algorithms(&self) -> Vec<AlgorithmSummary> {
        self.registry.summaries()
    }

    pub fn algorithm_config(&self, name: &str) -> Result<&AlgorithmConfig, ScoringError> {
        self.registry
            .get(name)
            .ok_or_else(|| ScoringError::AlgorithmNotFound {
                name: name.trim().to_ascii_lowercase(),
            })
    }
}

/// 50 with no data, 100 with every tracked input present.
fn confidence(present: usize) -> u8 {
    let share = present.min(TRACKED_INPUTS) as f64 / TRACKED_INPUTS as f64;
    (50.0 + 50.0 * share).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_grows_with_present_inputs() {
        assert_eq!(confidence(0), 50);
        assert_eq!(confidence(TRACKED_INPUTS), 100);
        let mut previous = 0;
        for present in 0..=TRACKED_INPUTS {
            let value = confidence(present);
            assert!(value >= previous);
            previous = value;
        }
    }
}
