use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::scoring::{Employee, RiskEngine, RiskFactors};

pub(super) fn assessed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn engine() -> RiskEngine {
    RiskEngine::default()
}

pub(super) fn skills(values: &[&str]) -> std::collections::BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Four months in, poorly rated, disengaged and paid well under band.
pub(super) fn flight_risk_employee() -> Employee {
    let mut employee = Employee::new("EMP1001");
    employee.name = Some("Jordan Blake".to_string());
    employee.department = Some("Marketing".to_string());
    employee.role = Some("Data Analyst".to_string());
    employee.tenure_months = Some(4.0);
    employee.performance_rating = Some(1.5);
    employee.engagement_score = Some(30.0);
    employee.comp_ratio = Some(0.65);
    employee.critical_skills = skills(&["Machine Learning"]);
    employee
}

/// Four years in, highly rated, engaged and paid above band.
pub(super) fn settled_employee() -> Employee {
    let mut employee = Employee::new("EMP1002");
    employee.name = Some("Priya Raman".to_string());
    employee.department = Some("Marketing".to_string());
    employee.role = Some("Brand Strategist".to_string());
    employee.tenure_months = Some(48.0);
    employee.performance_rating = Some(4.5);
    employee.engagement_score = Some(85.0);
    employee.comp_ratio = Some(1.15);
    employee
}

pub(super) fn unknown_employee(id: &str) -> Employee {
    Employee::new(id)
}

pub(super) fn quota_factors() -> RiskFactors {
    let mut factors = RiskFactors::default();
    factors
        .extra
        .insert("quotaAchievement".to_string(), json!(130));
    factors
}

pub(super) fn job_search_factors() -> RiskFactors {
    RiskFactors {
        active_job_search: true,
        ..RiskFactors::default()
    }
}
