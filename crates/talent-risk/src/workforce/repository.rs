use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{Employee, EmployeeId, RiskAssessment, RiskLevel, ValidationError};

/// Storage abstraction so the service can be exercised without a database.
pub trait EmployeeRepository: Send + Sync {
    fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn find_many(
        &self,
        filter: &EmployeeFilter,
        sort: EmployeeSort,
    ) -> Result<Vec<Employee>, RepositoryError>;
    fn insert(&self, employee: Employee) -> Result<Employee, RepositoryError>;
    /// Applies the patch and returns the updated record. The merged record is
    /// validated in the same write; a failing merge leaves the record untouched
    /// and returns `RepositoryError::Invalid`.
    fn update_one(
        &self,
        id: &EmployeeId,
        patch: &EmployeePatch,
    ) -> Result<Employee, RepositoryError>;
    fn delete_one(&self, id: &EmployeeId) -> Result<(), RepositoryError>;
    fn count_documents(&self, filter: &EmployeeFilter) -> Result<usize, RepositoryError>;
    fn aggregate_by_department(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<Vec<DepartmentSummary>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("employee already exists")]
    Conflict,
    #[error("employee not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("update rejected: {0}")]
    Invalid(ValidationError),
}

/// Query filter. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub min_risk_score: Option<u8>,
    /// Case-insensitive substring over id, name, role and department.
    pub search: Option<String>,
}

impl EmployeeFilter {
    pub fn department(department: impl Into<String>) -> Self {
        Self {
            department: Some(department.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        if let Some(department) = self.department.as_deref() {
            let same = employee
                .department
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(department.trim()));
            if !same {
                return false;
            }
        }

        if let Some(level) = self.risk_level {
            if employee.risk_level != Some(level) {
                return false;
            }
        }

        if let Some(min) = self.min_risk_score {
            if employee.risk_score.map_or(true, |score| score < min) {
                return false;
            }
        }

        if let Some(term) = self.search.as_deref().map(str::trim) {
            if !term.is_empty() {
                let term = term.to_lowercase();
                let haystacks = [
                    Some(employee.id.as_str()),
                    employee.name.as_deref(),
                    employee.role.as_deref(),
                    employee.department.as_deref(),
                ];
                let found = haystacks
                    .into_iter()
                    .flatten()
                    .any(|value| value.to_lowercase().contains(&term));
                if !found {
                    return false;
                }
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmployeeSort {
    #[default]
    RiskScoreDesc,
    RiskScoreAsc,
    Name,
}

impl EmployeeSort {
    pub fn apply(self, employees: &mut [Employee]) {
        match self {
            EmployeeSort::RiskScoreDesc => employees.sort_by(|a, b| {
                compare_scores(b.risk_score, a.risk_score).then_with(|| a.id.cmp(&b.id))
            }),
            EmployeeSort::RiskScoreAsc => employees.sort_by(|a, b| {
                compare_scores(a.risk_score, b.risk_score).then_with(|| a.id.cmp(&b.id))
            }),
            EmployeeSort::Name => employees.sort_by(|a, b| {
                let left = a.name.as_deref().unwrap_or_default().to_lowercase();
                let right = b.name.as_deref().unwrap_or_default().to_lowercase();
                left.cmp(&right).then_with(|| a.id.cmp(&b.id))
            }),
        }
    }
}

/// Unscored records sort below every scored one.
fn compare_scores(a: Option<u8>, b: Option<u8>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported sort '{0}'")]
pub struct UnknownSort(pub String);

impl FromStr for EmployeeSort {
    type Err = UnknownSort;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "-riskScore" | "riskScoreDesc" | "risk_desc" => Ok(EmployeeSort::RiskScoreDesc),
            "riskScore" | "riskScoreAsc" | "risk_asc" => Ok(EmployeeSort::RiskScoreAsc),
            "name" => Ok(EmployeeSort::Name),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, alias = "position", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenure_months: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    #[serde(
        default,
        alias = "compensationRatio",
        skip_serializing_if = "Option::is_none"
    )]
    pub comp_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_promotion_months: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_skills: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_gaps: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_flags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_assessed_at: Option<DateTime<Utc>>,
}

impl EmployeePatch {
    /// Write-back of an assessment's score, level, flags and time.
    pub fn from_assessment(assessment: &RiskAssessment) -> Self {
        Self {
            risk_score: Some(assessment.score),
            risk_level: Some(assessment.risk_level),
            risk_flags: Some(assessment.flags.clone()),
            last_assessed_at: Some(assessment.timestamp),
            ..Self::default()
        }
    }

    /// Applies the patch only when the merged record still validates.
    pub fn apply_validated(&self, employee: &mut Employee) -> Result<(), RepositoryError> {
        let mut merged = employee.clone();
        self.apply(&mut merged);
        merged.validate().map_err(RepositoryError::Invalid)?;
        *employee = merged;
        Ok(())
    }

    pub fn apply(&self, employee: &mut Employee) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut employee.name, &self.name);
        set(&mut employee.department, &self.department);
        set(&mut employee.role, &self.role);
        set(&mut employee.hire_date, &self.hire_date);
        set(&mut employee.tenure_months, &self.tenure_months);
        set(&mut employee.performance_rating, &self.performance_rating);
        set(&mut employee.performance_score, &self.performance_score);
        set(&mut employee.engagement_score, &self.engagement_score);
        set(&mut employee.comp_ratio, &self.comp_ratio);
        set(&mut employee.last_promotion_months, &self.last_promotion_months);
        set(&mut employee.risk_score, &self.risk_score);
        set(&mut employee.risk_level, &self.risk_level);
        set(&mut employee.last_assessed_at, &self.last_assessed_at);

        if let Some(skills) = &self.critical_skills {
            employee.critical_skills.clone_from(skills);
        }
        if let Some(gaps) = &self.skill_gaps {
            employee.skill_gaps.clone_from(gaps);
        }
        if let Some(flags) = &self.risk_flags {
            employee.risk_flags.clone_from(flags);
        }
    }
}

/// Per-department rollup of persisted risk fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub department: String,
    pub employee_count: usize,
    pub assessed_count: usize,
    pub average_risk_score: Option<f64>,
    pub high_risk_count: usize,
}

/// Groups records by department, for repositories without a native aggregation.
pub fn summarize_departments<'a, I>(employees: I) -> Vec<DepartmentSummary>
where
    I: IntoIterator<Item = &'a Employee>,
{
    let mut grouped: BTreeMap<String, Vec<&Employee>> = BTreeMap::new();
    for employee in employees {
        let department = employee
            .department
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("Unassigned")
            .to_string();
        grouped.entry(department).or_default().push(employee);
    }

    grouped
        .into_iter()
        .map(|(department, members)| {
            let scores: Vec<f64> = members
                .iter()
                .filter_map(|employee| employee.risk_score.map(f64::from))
                .collect();
            let average_risk_score = if scores.is_empty() {
                None
            } else {
                let mean = scores.iter().sum::<f64>() / scores.len() as f64;
                Some((mean * 10.0).round() / 10.0)
            };

            DepartmentSummary {
                department,
                employee_count: members.len(),
                assessed_count: scores.len(),
                average_risk_score,
                high_risk_count: members
                    .iter()
                    .filter(|employee| employee.risk_level.is_some_and(RiskLevel::is_high_risk))
                    .count(),
            }
        })
        .collect()
}
