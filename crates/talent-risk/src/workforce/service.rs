use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::repository::{
    DepartmentSummary, EmployeeFilter, EmployeePatch, EmployeeRepository, EmployeeSort,
    RepositoryError,
};
use crate::scoring::{
    AlgorithmComparison, AlgorithmConfig, AlgorithmSummary, BatchOutcome, BatchSummary,
    CustomAlgorithmDefinition, Employee, EmployeeId, OrganizationRiskReport, RiskAssessment,
    RiskEngine, RiskFactors, ScoringError, AUTO_ALGORITHM,
};

/// Options for assessing a stored employee.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub factors: RiskFactors,
    /// Writes score, level, flags and assessment time back to the record.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

impl Default for AssessmentRequest {
    fn default() -> Self {
        Self {
            algorithm: None,
            factors: RiskFactors::default(),
            persist: default_persist(),
        }
    }
}

/// Service composing the employee repository and the scoring engine.
///
/// Custom algorithm registration swaps in a new engine; scoring calls work on
/// the snapshot they started with.
pub struct RiskService<R> {
    repository: Arc<R>,
    engine: RwLock<Arc<RiskEngine>>,
}

impl<R> RiskService<R>
where
    R: EmployeeRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: RiskEngine) -> Self {
        Self {
            repository,
            engine: RwLock::new(Arc::new(engine)),
        }
    }

    /// Current engine snapshot.
    pub fn engine(&self) -> Arc<RiskEngine> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn list_employees(
        &self,
        filter: &EmployeeFilter,
        sort: EmployeeSort,
    ) -> Result<Vec<Employee>, RiskServiceError> {
        Ok(self.repository.find_many(filter, sort)?)
    }

    pub fn get_employee(&self, id: &EmployeeId) -> Result<Employee, RiskServiceError> {
        let employee = self
            .repository
            .find_by_id(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(employee)
    }

    /// Validates and stores a new record.
    pub fn create_employee(&self, employee: Employee) -> Result<Employee, RiskServiceError> {
        employee.validate().map_err(ScoringError::from)?;
        let stored = self.repository.insert(employee)?;
        info!(employee_id = %stored.id, "employee created");
        Ok(stored)
    }

    /// Applies a partial update. The repository rejects merges that fail validation.
    pub fn update_employee(
        &self,
        id: &EmployeeId,
        patch: &EmployeePatch,
    ) -> Result<Employee, RiskServiceError> {
        match self.repository.update_one(id, patch) {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::Invalid(error)) => Err(ScoringError::from(error).into()),
            Err(error) => Err(error.into()),
        }
    }

    pub fn delete_employee(&self, id: &EmployeeId) -> Result<(), RiskServiceError> {
        self.repository.delete_one(id)?;
        info!(employee_id = %id, "employee deleted");
        Ok(())
    }

    pub fn count_employees(&self, filter: &EmployeeFilter) -> Result<usize, RiskServiceError> {
        Ok(self.repository.count_documents(filter)?)
    }

    pub fn department_summary(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<Vec<DepartmentSummary>, RiskServiceError> {
        Ok(self.repository.aggregate_by_department(filter)?)
    }

    /// Scores a stored employee and optionally persists the result.
    pub fn assess(
        &self,
        id: &EmployeeId,
        request: &AssessmentRequest,
    ) -> Result<RiskAssessment, RiskServiceError> {
        let employee = self.get_employee(id)?;
        let assessment =
            self.engine()
                .score(&employee, &request.factors, request.algorithm.as_deref())?;

        if request.persist {
            self.repository
                .update_one(id, &EmployeePatch::from_assessment(&assessment))?;
        }

        info!(
            employee_id = %id,
            algorithm = %assessment.algorithm_used,
            score = assessment.score,
            persisted = request.persist,
            "risk assessed"
        );
        Ok(assessment)
    }

    /// Scores an ad-hoc record without touching the repository.
    pub fn score_snapshot(
        &self,
        employee: &Employee,
        factors: &RiskFactors,
        algorithm: Option<&str>,
    ) -> Result<RiskAssessment, RiskServiceError> {
        Ok(self.engine().score(employee, factors, algorithm)?)
    }

    pub fn score_batch(
        &self,
        documents: Vec<Value>,
        factors: &BTreeMap<EmployeeId, RiskFactors>,
        algorithm: Option<&str>,
    ) -> Vec<BatchOutcome> {
        self.engine().score_documents(documents, factors, algorithm)
    }

    pub fn compare(
        &self,
        id: &EmployeeId,
        factors: &RiskFactors,
    ) -> Result<AlgorithmComparison, RiskServiceError> {
        let employee = self.get_employee(id)?;
        Ok(self.engine().compare(&employee, factors)?)
    }

    /// Scores every matching stored employee and summarizes the results.
    /// Records that fail to score are logged and left out of the report.
    pub fn organization_report(
        &self,
        department: Option<&str>,
        algorithm: Option<&str>,
    ) -> Result<OrganizationRiskReport, RiskServiceError> {
        let filter = EmployeeFilter {
            department: department
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            ..EmployeeFilter::default()
        };
        let employees = self.repository.find_many(&filter, EmployeeSort::default())?;

        let engine = self.engine();
        ensure_algorithm(&engine, algorithm)?;

        let outcomes = engine.score_many(&employees, &BTreeMap::new(), algorithm);
        let mut assessments = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.result {
                Ok(assessment) => assessments.push(assessment),
                Err(error) => warn!(
                    employee_id = %outcome.employee_id,
                    %error,
                    "employee skipped in organization report"
                ),
            }
        }

        Ok(OrganizationRiskReport::from_assessments(&assessments))
    }

    /// Rescores every matching stored employee and writes the results back.
    /// Records that fail to score keep their previous risk fields.
    pub fn recalculate_all(
        &self,
        filter: &EmployeeFilter,
        algorithm: Option<&str>,
    ) -> Result<Recalculation, RiskServiceError> {
        let engine = self.engine();
        ensure_algorithm(&engine, algorithm)?;

        let employees = self.repository.find_many(filter, EmployeeSort::default())?;
        let outcomes = engine.score_many(&employees, &BTreeMap::new(), algorithm);

        let mut persisted = 0;
        for outcome in &outcomes {
            let Some(assessment) = outcome.assessment() else {
                continue;
            };
            match self
                .repository
                .update_one(&outcome.employee_id, &EmployeePatch::from_assessment(assessment))
            {
                Ok(_) => persisted += 1,
                Err(RepositoryError::NotFound) => warn!(
                    employee_id = %outcome.employee_id,
                    "employee removed before its score was written back"
                ),
                Err(error) => return Err(error.into()),
            }
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            total = summary.total,
            failed = summary.failed,
            persisted,
            "risk scores recalculated"
        );
        Ok(Recalculation { summary, persisted })
    }

    pub fn list_algorithms(&self) -> Vec<AlgorithmSummary> {
        self.engine().list_algorithms()
    }

    pub fn algorithm_config(&self, name: &str) -> Result<AlgorithmConfig, RiskServiceError> {
        Ok(self.engine().algorithm_config(name)?.clone())
    }

    /// Registers a custom algorithm on a copy of the engine and swaps it in.
    pub fn register_algorithm(
        &self,
        definition: CustomAlgorithmDefinition,
    ) -> Result<AlgorithmSummary, RiskServiceError> {
        let mut guard = self.engine.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = RiskEngine::clone(&guard);
        let summary = next.register_algorithm(definition)?;
        *guard = Arc::new(next);

        info!(algorithm = %summary.name, "custom algorithm registered");
        Ok(summary)
    }
}

/// Result of a bulk rescore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recalculation {
    pub summary: BatchSummary,
    /// Successful assessments written back to the repository.
    pub persisted: usize,
}

/// Fails fast on an explicit algorithm the engine does not know.
fn ensure_algorithm(engine: &RiskEngine, algorithm: Option<&str>) -> Result<(), ScoringError> {
    if let Some(name) = algorithm.map(str::trim).filter(|name| !name.is_empty()) {
        if !name.eq_ignore_ascii_case(AUTO_ALGORITHM) {
            engine.algorithm_config(name)?;
        }
    }
    Ok(())
}

/// Error raised by the risk service.
#[derive(Debug, thiserror::Error)]
pub enum RiskServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
