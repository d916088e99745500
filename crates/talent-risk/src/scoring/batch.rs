use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::assessment::RiskAssessment;
use super::classifier::RiskLevel;
use super::domain::{Employee, EmployeeId, RiskFactors};
use super::engine::RiskEngine;
use super::error::ScoringError;

/// Outcome of one batch item. A failure never aborts the rest of the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub employee_id: EmployeeId,
    pub result: Result<RiskAssessment, ScoringError>,
}

impl BatchOutcome {
    pub fn assessment(&self) -> Option<&RiskAssessment> {
        self.result.as_ref().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful items per level; every level is present.
    pub level_counts: BTreeMap<RiskLevel, usize>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut level_counts: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|level| (*level, 0)).collect();
        for assessment in outcomes.iter().filter_map(BatchOutcome::assessment) {
            *level_counts.entry(assessment.risk_level).or_default() += 1;
        }

        let succeeded = level_counts.values().sum();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            level_counts,
        }
    }
}

fn wrap_failure(employee_id: &EmployeeId, error: ScoringError) -> ScoringError {
    match error {
        ScoringError::Calculation { .. } => error,
        other => ScoringError::Calculation {
            employee_id: employee_id.clone(),
            reason: other.to_string(),
        },
    }
}

/// Best-effort identifier for a document that may not parse.
fn document_id(document: &Value, index: usize) -> EmployeeId {
    ["id", "employeeId", "_id"]
        .iter()
        .find_map(|key| document.get(*key).and_then(EmployeeId::from_value))
        .unwrap_or_else(|| EmployeeId(format!("#{index}")))
}

impl RiskEngine {
    /// Scores employees in parallel. Output order matches input order.
    pub fn score_many(
        &self,
        employees: &[Employee],
        factors: &BTreeMap<EmployeeId, RiskFactors>,
        algorithm: Option<&str>,
    ) -> Vec<BatchOutcome> {
        let now = Utc::now();
        let empty = RiskFactors::default();

        let outcomes: Vec<BatchOutcome> = employees
            .par_iter()
            .map(|employee| {
                let employee_factors = factors.get(&employee.id).unwrap_or(&empty);
                let result = self
                    .score_at(employee, employee_factors, algorithm, now)
                    .map_err(|error| wrap_failure(&employee.id, error));
                BatchOutcome {
                    employee_id: employee.id.clone(),
                    result,
                }
            })
            .collect();

        log_summary(&outcomes);
        outcomes
    }

    /// Parses and scores loosely-typed documents; a malformed document fails only itself.
    pub fn score_documents(
        &self,
        documents: Vec<Value>,
        factors: &BTreeMap<EmployeeId, RiskFactors>,
        algorithm: Option<&str>,
    ) -> Vec<BatchOutcome> {
        self.score_documents_at(documents, factors, algorithm, Utc::now())
    }

    pub fn score_documents_at(
        &self,
        documents: Vec<Value>,
        factors: &BTreeMap<EmployeeId, RiskFactors>,
        algorithm: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<BatchOutcome> {
        let empty = RiskFactors::default();

        let outcomes: Vec<BatchOutcome> = documents
            .into_par_iter()
            .enumerate()
            .map(|(index, document)| {
                let fallback_id = document_id(&document, index);
                match Employee::from_json(document) {
                    Ok(employee) => {
                        let employee_factors = factors.get(&employee.id).unwrap_or(&empty);
                        let result = self
                            .score_at(&employee, employee_factors, algorithm, now)
                            .map_err(|error| wrap_failure(&employee.id, error));
                        BatchOutcome {
                            employee_id: employee.id,
                            result,
                        }
                    }
                    Err(error) => BatchOutcome {
                        result: Err(wrap_failure(&fallback_id, error.into())),
                        employee_id: fallback_id,
                    },
                }
            })
            .collect();

        log_summary(&outcomes);
        outcomes
    }
}

fn log_summary(outcomes: &[BatchOutcome]) {
    for outcome in outcomes {
        if let Err(error) = &outcome.result {
            warn!(employee_id = %outcome.employee_id, %error, "batch item failed");
        }
    }

    let summary = BatchSummary::from_outcomes(outcomes);
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch scoring finished"
    );
}
