use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::repository::{
    EmployeeFilter, EmployeePatch, EmployeeRepository, EmployeeSort, RepositoryError,
};
use super::service::{AssessmentRequest, RiskService, RiskServiceError};
use crate::scoring::{
    BatchSummary, CustomAlgorithmDefinition, Employee, EmployeeId, OrganizationRiskReport,
    RiskAssessment, RiskFactors, RiskLevel, ScoringError,
};

/// Router exposing employee records and risk scoring under `/api/v1`.
pub fn workforce_router<R>(service: Arc<RiskService<R>>) -> Router
where
    R: EmployeeRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/employees",
            get(list_employees_handler::<R>).post(create_employee_handler::<R>),
        )
        .route(
            "/api/v1/employees/stats/summary",
            get(employee_summary_handler::<R>),
        )
        .route(
            "/api/v1/employees/:id",
            get(get_employee_handler::<R>)
                .put(update_employee_handler::<R>)
                .delete(delete_employee_handler::<R>),
        )
        .route(
            "/api/v1/risk/calculate/:employee_id",
            post(calculate_handler::<R>),
        )
        .route("/api/v1/risk/score", post(score_handler::<R>))
        .route("/api/v1/risk/batch-calculate", post(batch_handler::<R>))
        .route(
            "/api/v1/risk/compare-algorithms/:employee_id",
            post(compare_handler::<R>),
        )
        .route(
            "/api/v1/risk/analytics/organization",
            post(organization_handler::<R>),
        )
        .route("/api/v1/risk/recalculate", post(recalculate_handler::<R>))
        .route("/api/v1/risk/report/generate", post(report_handler))
        .route("/api/v1/risk/algorithms", get(algorithms_handler::<R>))
        .route(
            "/api/v1/risk/algorithms/custom",
            post(register_algorithm_handler::<R>),
        )
        .route(
            "/api/v1/risk/algorithms/:name/config",
            get(algorithm_config_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListQuery {
    department: Option<String>,
    risk_level: Option<String>,
    min_risk_score: Option<u8>,
    search: Option<String>,
    sort: Option<String>,
}

impl ListQuery {
    fn into_parts(self) -> Result<(EmployeeFilter, EmployeeSort), String> {
        let risk_level = self
            .risk_level
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<RiskLevel>())
            .transpose()
            .map_err(|error| error.to_string())?;
        let sort = self
            .sort
            .map(|value| value.parse::<EmployeeSort>())
            .transpose()
            .map_err(|error| error.to_string())?
            .unwrap_or_default();

        let filter = EmployeeFilter {
            department: self.department.filter(|value| !value.trim().is_empty()),
            risk_level,
            min_risk_score: self.min_risk_score,
            search: self.search,
        };
        Ok((filter, sort))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScoreRequest {
    employee: Value,
    #[serde(default)]
    factors: RiskFactors,
    #[serde(default)]
    algorithm: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchRequest {
    employees: Vec<Value>,
    #[serde(default)]
    factors_map: BTreeMap<String, RiskFactors>,
    #[serde(default)]
    algorithm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompareRequest {
    #[serde(default)]
    factors: RiskFactors,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OrganizationRequest {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    algorithm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecalculateRequest {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    algorithm: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportRequest {
    assessments: Vec<RiskAssessment>,
}

fn error_response(error: RiskServiceError) -> Response {
    let status = match &error {
        RiskServiceError::Scoring(ScoringError::Validation(_))
        | RiskServiceError::Scoring(ScoringError::Configuration(_))
        | RiskServiceError::Repository(RepositoryError::Invalid(_)) => StatusCode::BAD_REQUEST,
        RiskServiceError::Scoring(ScoringError::AlgorithmNotFound { .. })
        | RiskServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        RiskServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub(crate) async fn list_employees_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    let (filter, sort) = match query.into_parts() {
        Ok(parts) => parts,
        Err(message) => return bad_request(message),
    };

    match service.list_employees(&filter, sort) {
        Ok(employees) => {
            let payload = json!({
                "total": employees.len(),
                "employees": employees,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn employee_summary_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    let filter = EmployeeFilter::default();
    let summary = service.count_employees(&filter).and_then(|total| {
        let departments = service.department_summary(&filter)?;
        Ok((total, departments))
    });

    match summary {
        Ok((total, departments)) => {
            let high_risk: usize = departments.iter().map(|item| item.high_risk_count).sum();
            let payload = json!({
                "totalEmployees": total,
                "highRiskEmployees": high_risk,
                "departments": departments,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_employee_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Path(id): Path<String>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.get_employee(&EmployeeId(id)) {
        Ok(employee) => (StatusCode::OK, axum::Json(employee)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_employee_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    axum::Json(document): axum::Json<Value>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    let employee = match Employee::from_json(document) {
        Ok(employee) => employee,
        Err(error) => return error_response(ScoringError::from(error).into()),
    };

    match service.create_employee(employee) {
        Ok(stored) => (StatusCode::CREATED, axum::Json(stored)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_employee_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Path(id): Path<String>,
    axum::Json(patch): axum::Json<EmployeePatch>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.update_employee(&EmployeeId(id), &patch) {
        Ok(updated) => (StatusCode::OK, axum::Json(updated)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_employee_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Path(id): Path<String>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.delete_employee(&EmployeeId(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn calculate_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Path(employee_id): Path<String>,
    axum::Json(request): axum::Json<AssessmentRequest>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.assess(&EmployeeId(employee_id), &request) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    let employee = match Employee::from_json(request.employee) {
        Ok(employee) => employee,
        Err(error) => return error_response(ScoringError::from(error).into()),
    };

    match service.score_snapshot(&employee, &request.factors, request.algorithm.as_deref()) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn batch_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    let factors: BTreeMap<EmployeeId, RiskFactors> = request
        .factors_map
        .into_iter()
        .map(|(id, factors)| (EmployeeId(id), factors))
        .collect();

    let outcomes = service.score_batch(request.employees, &factors, request.algorithm.as_deref());
    let summary = BatchSummary::from_outcomes(&outcomes);
    let results: Vec<Value> = outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(assessment) => json!({
                "employeeId": outcome.employee_id,
                "success": true,
                "assessment": assessment,
            }),
            Err(error) => json!({
                "employeeId": outcome.employee_id,
                "success": false,
                "error": error.to_string(),
            }),
        })
        .collect();

    let payload = json!({
        "summary": summary,
        "results": results,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn compare_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Path(employee_id): Path<String>,
    axum::Json(request): axum::Json<CompareRequest>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.compare(&EmployeeId(employee_id), &request.factors) {
        Ok(comparison) => (StatusCode::OK, axum::Json(comparison)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn organization_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    axum::Json(request): axum::Json<OrganizationRequest>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.organization_report(request.department.as_deref(), request.algorithm.as_deref())
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recalculate_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    axum::Json(request): axum::Json<RecalculateRequest>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    let filter = EmployeeFilter {
        department: request.department.filter(|value| !value.trim().is_empty()),
        ..EmployeeFilter::default()
    };

    match service.recalculate_all(&filter, request.algorithm.as_deref()) {
        Ok(recalculation) => (StatusCode::OK, axum::Json(recalculation)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Builds a report from assessments the caller already holds.
pub(crate) async fn report_handler(axum::Json(request): axum::Json<ReportRequest>) -> Response {
    let report = OrganizationRiskReport::from_assessments(&request.assessments);
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn algorithms_handler<R>(State(service): State<Arc<RiskService<R>>>) -> Response
where
    R: EmployeeRepository + 'static,
{
    let algorithms = service.list_algorithms();
    let payload = json!({
        "count": algorithms.len(),
        "algorithms": algorithms,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn algorithm_config_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    Path(name): Path<String>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.algorithm_config(&name) {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_algorithm_handler<R>(
    State(service): State<Arc<RiskService<R>>>,
    axum::Json(definition): axum::Json<CustomAlgorithmDefinition>,
) -> Response
where
    R: EmployeeRepository + 'static,
{
    match service.register_algorithm(definition) {
        Ok(summary) => (StatusCode::CREATED, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}
