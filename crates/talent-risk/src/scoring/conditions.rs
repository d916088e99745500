use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::calculators::ScoreInputs;

/// Comparison applied by a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Gte,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Lte,
    Contains,
    Exists,
}

/// Declarative predicate over one employee or factor field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Returns a reason when the condition could never be evaluated meaningfully.
    pub(crate) fn problem(&self) -> Option<String> {
        if self.field.trim().is_empty() {
            return Some("condition field must not be blank".to_string());
        }

        match self.operator {
            ConditionOperator::Gt
            | ConditionOperator::Gte
            | ConditionOperator::Lt
            | ConditionOperator::Lte
                if !self.value.is_number() =>
            {
                Some(format!(
                    "operator {:?} needs a numeric value, got {}",
                    self.operator, self.value
                ))
            }
            ConditionOperator::Eq | ConditionOperator::Ne | ConditionOperator::Contains
                if self.value.is_null() =>
            {
                Some(format!("operator {:?} needs a value", self.operator))
            }
            _ => None,
        }
    }

    /// A field that cannot be resolved makes the condition false, whatever the operator.
    pub(crate) fn holds(&self, inputs: &ScoreInputs<'_>) -> bool {
        let Some(actual) = resolve_field(self.field.trim(), inputs).filter(|v| !v.is_null())
        else {
            return false;
        };

        match self.operator {
            ConditionOperator::Exists => true,
            ConditionOperator::Eq => values_equal(&actual, &self.value),
            ConditionOperator::Ne => !values_equal(&actual, &self.value),
            ConditionOperator::Gt => compare(&actual, &self.value) == Some(Ordering::Greater),
            ConditionOperator::Gte => matches!(
                compare(&actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ConditionOperator::Lt => compare(&actual, &self.value) == Some(Ordering::Less),
            ConditionOperator::Lte => matches!(
                compare(&actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ConditionOperator::Contains => contains(&actual, &self.value),
        }
    }
}

fn resolve_field(field: &str, inputs: &ScoreInputs<'_>) -> Option<Value> {
    let employee = inputs.employee;
    let factors = inputs.factors;

    match field {
        "id" | "employeeId" => Some(json!(employee.id.as_str())),
        "name" => employee.name.as_ref().map(|v| json!(v)),
        "department" => employee.department.as_ref().map(|v| json!(v)),
        "role" | "position" => employee.role.as_ref().map(|v| json!(v)),
        "tenureMonths" => inputs.tenure_months.map(|v| json!(v)),
        "performanceRating" => employee.performance_rating.map(|v| json!(v)),
        "performanceScore" => employee.performance_score.map(|v| json!(v)),
        "performancePct" => inputs.performance_pct.map(|v| json!(v)),
        "engagementScore" => employee.engagement_score.map(|v| json!(v)),
        "compRatio" | "compensationRatio" => employee.comp_ratio.map(|v| json!(v)),
        "lastPromotionMonths" => inputs.last_promotion_months.map(|v| json!(v)),
        "criticalSkills" => Some(json!(employee.critical_skills)),
        "skillGaps" => Some(json!(employee.skill_gaps)),
        "riskScore" => employee.risk_score.map(|v| json!(v)),
        "marketDemand" => factors.market_demand.map(|v| json!(v)),
        "recruiterContacts" => factors.recruiter_contacts.map(|v| json!(v)),
        "competitorOffers" => factors.competitor_offers.map(|v| json!(v)),
        "skillRarity" => factors.skill_rarity.map(|v| json!(v)),
        "monthsSinceRaise" => factors.months_since_raise.map(|v| json!(v)),
        "trainingHours" => factors.training_hours.map(|v| json!(v)),
        "activeJobSearch" => Some(json!(factors.active_job_search)),
        "resumeUpdateRecent" => Some(json!(factors.resume_update_recent)),
        "interviewedRecently" => Some(json!(factors.interviewed_recently)),
        "isCriticalRole" => Some(json!(factors.is_critical_role)),
        _ => factors.extra.get(field).cloned(),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
        (Value::String(a), Value::String(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => actual == expected,
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    actual.as_f64()?.partial_cmp(&expected.as_f64()?)
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(text) => expected
            .as_str()
            .map(|needle| text.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}
