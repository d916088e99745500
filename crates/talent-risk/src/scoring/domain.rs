use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::classifier::RiskLevel;
use super::error::ValidationError;

const DAYS_PER_MONTH: f64 = 30.44;

/// Identifier wrapper for employee records. Legacy records carry integer ids,
/// which are kept in their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EmployeeId(pub String);

impl<'de> Deserialize<'de> for EmployeeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = EmployeeId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a string or integer employee id")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(EmployeeId::from(value))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
                Ok(EmployeeId(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(EmployeeId(value.to_string()))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                Ok(EmployeeId(value.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

impl EmployeeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads a string or integer id out of an untyped document value.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(text) => Some(EmployeeId(text.clone())),
            serde_json::Value::Number(number) if number.is_i64() || number.is_u64() => {
                Some(EmployeeId(number.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmployeeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Employee snapshot as stored by the persistence layer. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(alias = "employeeId", alias = "_id")]
    pub id: EmployeeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(
        default,
        alias = "position",
        alias = "title",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenure_months: Option<f64>,
    /// Manager rating on a 0-5 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_rating: Option<f64>,
    /// Percentage score, consulted only when no rating is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    /// Pay divided by the market band midpoint.
    #[serde(
        default,
        alias = "compensationRatio",
        skip_serializing_if = "Option::is_none"
    )]
    pub comp_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_promotion_months: Option<f64>,
    #[serde(default)]
    pub critical_skills: BTreeSet<String>,
    #[serde(default)]
    pub skill_gaps: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub risk_flags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_assessed_at: Option<DateTime<Utc>>,
}

impl Employee {
    /// Bare record carrying only the identity field.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: EmployeeId(id.into()),
            name: None,
            department: None,
            role: None,
            hire_date: None,
            tenure_months: None,
            performance_rating: None,
            performance_score: None,
            engagement_score: None,
            comp_ratio: None,
            last_promotion_months: None,
            critical_skills: BTreeSet::new(),
            skill_gaps: BTreeSet::new(),
            risk_score: None,
            risk_level: None,
            risk_flags: BTreeSet::new(),
            last_assessed_at: None,
        }
    }

    /// Parses one loosely-typed JSON document, as received in batch payloads.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|err| ValidationError::Malformed {
            reason: err.to_string(),
        })
    }

    /// Rejects records the calculators cannot interpret.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "id" });
        }

        check_range("performanceRating", self.performance_rating, 0.0, 5.0)?;
        check_range("performanceScore", self.performance_score, 0.0, 100.0)?;
        check_range("engagementScore", self.engagement_score, 0.0, 100.0)?;
        check_range("tenureMonths", self.tenure_months, 0.0, f64::MAX)?;
        check_range(
            "lastPromotionMonths",
            self.last_promotion_months,
            0.0,
            f64::MAX,
        )?;

        if let Some(ratio) = self.comp_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: "compRatio",
                    value: ratio,
                    expected: "a positive ratio",
                });
            }
        }

        Ok(())
    }

    /// Tenure in months, taken from `tenureMonths` or derived from `hireDate`.
    pub fn tenure_months_at(&self, as_of: NaiveDate) -> Option<f64> {
        if let Some(months) = self.tenure_months {
            return Some(months);
        }

        self.hire_date.map(|hired| {
            let days = (as_of - hired).num_days().max(0) as f64;
            days / DAYS_PER_MONTH
        })
    }

    /// Canonical performance percentage: `rating / 5 * 100`, else the stored score.
    pub fn performance_pct(&self) -> Option<f64> {
        self.performance_rating
            .map(|rating| rating / 5.0 * 100.0)
            .or(self.performance_score)
    }
}

fn check_range(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    match value {
        Some(value) if !value.is_finite() || value < min || value > max => {
            Err(ValidationError::OutOfRange {
                field,
                value,
                expected: match (min, max) {
                    (_, max) if max == 5.0 => "a value between 0 and 5",
                    (_, max) if max == 100.0 => "a value between 0 and 100",
                    _ => "a non-negative value",
                },
            })
        }
        _ => Ok(()),
    }
}

/// How scarce an employee's skill profile is on the open market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillRarity {
    Common,
    Specialized,
    Rare,
}

/// Caller-supplied market and behavioral context. Nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_demand: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recruiter_contacts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_offers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_rarity: Option<SkillRarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_promotion_months: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months_since_raise: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_hours: Option<f64>,
    /// Prior scores, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub historical_scores: Vec<f64>,
    #[serde(default)]
    pub active_job_search: bool,
    #[serde(default)]
    pub resume_update_recent: bool,
    #[serde(default)]
    pub interviewed_recently: bool,
    #[serde(default)]
    pub is_critical_role: bool,
    /// Reference date for tenure derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RiskFactors {
    /// Labels of the immediate attrition signals that are present.
    pub fn immediate_signals(&self) -> Vec<&'static str> {
        let mut signals = Vec::new();
        if self.active_job_search {
            signals.push("active_job_search");
        }
        if self.resume_update_recent {
            signals.push("recent_resume_update");
        }
        if self.interviewed_recently {
            signals.push("recent_interviews");
        }
        signals
    }
}
