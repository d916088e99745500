//! Employee records and risk assessments served over HTTP.
//!
//! The [`RiskService`] composes an [`EmployeeRepository`] with the scoring
//! engine, writes assessments back to stored records and hosts runtime
//! algorithm registration. [`workforce_router`] exposes it through axum.

mod import;
mod repository;
mod router;
mod service;

#[cfg(test)]
mod tests;

pub use import::{EmployeeCsvImporter, EmployeeImportError};
pub use repository::{
    summarize_departments, DepartmentSummary, EmployeeFilter, EmployeePatch, EmployeeRepository,
    EmployeeSort, RepositoryError, UnknownSort,
};
pub use router::workforce_router;
pub use service::{AssessmentRequest, Recalculation, RiskService, RiskServiceError};
