use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::scoring::Employee;

const SKILL_SEPARATOR: char = ';';

#[derive(Debug)]
pub enum EmployeeImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, reason: String },
}

impl std::fmt::Display for EmployeeImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployeeImportError::Io(err) => write!(f, "failed to read employee roster: {}", err),
            EmployeeImportError::Csv(err) => write!(f, "invalid employee CSV data: {}", err),
            EmployeeImportError::InvalidRow { line, reason } => {
                write!(f, "invalid employee on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for EmployeeImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmployeeImportError::Io(err) => Some(err),
            EmployeeImportError::Csv(err) => Some(err),
            EmployeeImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for EmployeeImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for EmployeeImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads an employee roster exported as CSV.
pub struct EmployeeCsvImporter;

impl EmployeeCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Employee>, EmployeeImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Employee>, EmployeeImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut employees = Vec::new();
        let mut seen = HashSet::new();

        for (index, record) in csv_reader.deserialize::<EmployeeRow>().enumerate() {
            // Line 1 holds the headers.
            let line = index + 2;
            let employee = record?
                .into_employee()
                .map_err(|reason| EmployeeImportError::InvalidRow { line, reason })?;

            employee
                .validate()
                .map_err(|err| EmployeeImportError::InvalidRow {
                    line,
                    reason: err.to_string(),
                })?;
            if !seen.insert(employee.id.clone()) {
                return Err(EmployeeImportError::InvalidRow {
                    line,
                    reason: format!("duplicate employee id {}", employee.id),
                });
            }

            employees.push(employee);
        }

        Ok(employees)
    }
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    #[serde(rename = "employeeId")]
    employee_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(rename = "hireDate", default, deserialize_with = "empty_string_as_none")]
    hire_date: Option<String>,
    #[serde(
        rename = "tenureMonths",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    tenure_months: Option<String>,
    #[serde(
        rename = "performanceRating",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    performance_rating: Option<String>,
    #[serde(
        rename = "performanceScore",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    performance_score: Option<String>,
    #[serde(
        rename = "engagementScore",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    engagement_score: Option<String>,
    #[serde(rename = "compRatio", default, deserialize_with = "empty_string_as_none")]
    comp_ratio: Option<String>,
    #[serde(
        rename = "lastPromotionMonths",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    last_promotion_months: Option<String>,
    #[serde(
        rename = "criticalSkills",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    critical_skills: Option<String>,
    #[serde(rename = "skillGaps", default, deserialize_with = "empty_string_as_none")]
    skill_gaps: Option<String>,
}

impl EmployeeRow {
    fn into_employee(self) -> Result<Employee, String> {
        let mut employee = Employee::new(self.employee_id);
        employee.name = self.name;
        employee.department = self.department;
        employee.role = self.role;
        employee.hire_date = self
            .hire_date
            .as_deref()
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| format!("hireDate '{value}' is not a YYYY-MM-DD date"))
            })
            .transpose()?;
        employee.tenure_months = parse_number("tenureMonths", self.tenure_months)?;
        employee.performance_rating =
            parse_number("performanceRating", self.performance_rating)?;
        employee.performance_score = parse_number("performanceScore", self.performance_score)?;
        employee.engagement_score = parse_number("engagementScore", self.engagement_score)?;
        employee.comp_ratio = parse_number("compRatio", self.comp_ratio)?;
        employee.last_promotion_months =
            parse_number("lastPromotionMonths", self.last_promotion_months)?;
        employee.critical_skills = split_skills(self.critical_skills);
        employee.skill_gaps = split_skills(self.skill_gaps);
        Ok(employee)
    }
}

fn parse_number(column: &str, value: Option<String>) -> Result<Option<f64>, String> {
    value
        .map(|raw| {
            raw.parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| format!("{column} '{raw}' is not a number"))
        })
        .transpose()
}

fn split_skills(value: Option<String>) -> BTreeSet<String> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(SKILL_SEPARATOR)
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
