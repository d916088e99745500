use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use super::calculators::Dimension;
use super::classifier::RiskLevel;
use super::domain::{Employee, EmployeeId, RiskFactors};
use super::engine::RiskEngine;
use super::error::ScoringError;

/// One employee scored by every registered algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmComparison {
    pub employee_id: EmployeeId,
    pub results: Vec<AlgorithmResult>,
    pub meta: ComparisonMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmResult {
    pub algorithm: String,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub confidence: u8,
    pub factors: BTreeMap<Dimension, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonMeta {
    pub average: f64,
    pub variance: f64,
    pub count: usize,
}

impl ComparisonMeta {
    fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                average: 0.0,
                variance: 0.0,
                count: 0,
            };
        }

        let count = scores.len() as f64;
        let average = scores.iter().sum::<f64>() / count;
        let variance = scores
            .iter()
            .map(|score| (score - average).powi(2))
            .sum::<f64>()
            / count;

        Self {
            average: round_two(average),
            variance: round_two(variance),
            count: scores.len(),
        }
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl RiskEngine {
    /// Runs every registered algorithm over the same inputs, in registration order.
    pub fn compare(
        &self,
        employee: &Employee,
        factors: &RiskFactors,
    ) -> Result<AlgorithmComparison, ScoringError> {
        employee.validate()?;
        let now = Utc::now();

        let results: Vec<AlgorithmResult> = self
            .registry()
            .iter()
            .map(|algorithm| {
                let assessment = self.assess_with(algorithm, employee, factors, now);
                AlgorithmResult {
                    algorithm: algorithm.name.clone(),
                    score: assessment.score,
                    risk_level: assessment.risk_level,
                    confidence: assessment.confidence,
                    factors: assessment.factors,
                }
            })
            .collect();

        let scores: Vec<f64> = results
            .iter()
            .map(|result| f64::from(result.score))
            .collect();

        Ok(AlgorithmComparison {
            employee_id: employee.id.clone(),
            meta: ComparisonMeta::from_scores(&scores),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_reports_population_variance() {
        let meta = ComparisonMeta::from_scores(&[40.0, 50.0, 60.0]);
        assert_eq!(meta.average, 50.0);
        assert_eq!(meta.variance, 66.67);
        assert_eq!(meta.count, 3);
    }

    #[test]
    fn meta_handles_no_scores() {
        let meta = ComparisonMeta::from_scores(&[]);
        assert_eq!(meta.count, 0);
        assert_eq!(meta.average, 0.0);
    }
}
