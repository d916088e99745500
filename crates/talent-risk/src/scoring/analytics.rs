use std::collections::BTreeMap;

use serde::Serialize;

use super::assessment::RiskAssessment;
use super::calculators::Dimension;
use super::classifier::RiskLevel;
use super::domain::EmployeeId;

const UNASSIGNED: &str = "Unassigned";
const HOTSPOT_AVERAGE: f64 = 60.0;
const HOTSPOT_HIGH_RISK_PCT: f64 = 30.0;
const ORG_HIGH_RISK_PCT: f64 = 20.0;
const CRITICAL_EMPLOYEE_SCORE: u8 = 80;
const CRITICAL_EMPLOYEE_LIMIT: usize = 10;
const HIGH_FACTOR_SCORE: f64 = 70.0;
const FACTOR_PATTERN_MIN_EMPLOYEES: usize = 5;

/// Inclusive score ranges of the distribution buckets.
const BUCKETS: [(u8, u8); 5] = [(0, 19), (20, 39), (40, 59), (60, 79), (80, 100)];

/// Portfolio view over a set of assessments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRiskReport {
    pub total: usize,
    pub average_score: f64,
    pub median_score: f64,
    pub level_counts: BTreeMap<RiskLevel, usize>,
    pub distribution: Vec<ScoreBucket>,
    pub departments: Vec<DepartmentRollup>,
    pub hotspots: Vec<Hotspot>,
    /// Highest scores above 80, at most ten, highest first.
    pub critical_employees: Vec<CriticalEmployee>,
    /// Dimensions scoring above 70 for at least five employees.
    pub factor_patterns: Vec<FactorPattern>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBucket {
    pub range: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRollup {
    pub department: String,
    pub count: usize,
    pub average_score: f64,
    pub high_risk_count: usize,
    pub high_risk_pct: f64,
    pub highest_risk_employee: Option<EmployeeId>,
    pub highest_score: u8,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub department: String,
    pub average_score: f64,
    pub high_risk_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalEmployee {
    pub employee_id: EmployeeId,
    pub department: Option<String>,
    pub score: u8,
    pub risk_level: RiskLevel,
    /// Dimensions whose sub-score exceeds 70.
    pub factors: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorPattern {
    pub factor: Dimension,
    pub affected_employees: usize,
    pub percentage: f64,
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|score| f64::from(*score)).sum::<f64>() / scores.len() as f64
}

fn median(scores: &[u8]) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_unstable();
    match sorted.len() {
        0 => 0.0,
        len if len % 2 == 1 => f64::from(sorted[len / 2]),
        len => (f64::from(sorted[len / 2 - 1]) + f64::from(sorted[len / 2])) / 2.0,
    }
}

impl OrganizationRiskReport {
    pub fn from_assessments(assessments: &[RiskAssessment]) -> Self {
        let scores: Vec<u8> = assessments.iter().map(|item| item.score).collect();

        let mut level_counts: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|level| (*level, 0)).collect();
        for assessment in assessments {
            *level_counts.entry(assessment.risk_level).or_default() += 1;
        }

        let distribution = BUCKETS
            .iter()
            .map(|(low, high)| ScoreBucket {
                range: format!("{low}-{high}"),
                count: scores
                    .iter()
                    .filter(|score| (*low..=*high).contains(*score))
                    .count(),
            })
            .collect();

        let departments = department_rollups(assessments);
        let hotspots: Vec<Hotspot> = departments
            .iter()
            .filter(|rollup| {
                rollup.average_score >= HOTSPOT_AVERAGE
                    || rollup.high_risk_pct >= HOTSPOT_HIGH_RISK_PCT
            })
            .map(|rollup| Hotspot {
                department: rollup.department.clone(),
                average_score: rollup.average_score,
                high_risk_pct: rollup.high_risk_pct,
            })
            .collect();

        let recommendations = organization_recommendations(assessments, &level_counts, &hotspots);

        Self {
            critical_employees: critical_employees(assessments),
            factor_patterns: factor_patterns(assessments),
            total: assessments.len(),
            average_score: round_one(mean(&scores)),
            median_score: median(&scores),
            level_counts,
            distribution,
            departments,
            hotspots,
            recommendations,
        }
    }

    pub fn high_risk_count(&self) -> usize {
        self.level_counts
            .iter()
            .filter(|(level, _)| level.is_high_risk())
            .map(|(_, count)| *count)
            .sum()
    }
}

fn high_factors(assessment: &RiskAssessment) -> impl Iterator<Item = Dimension> + '_ {
    assessment
        .factors
        .iter()
        .filter(|(_, score)| **score > HIGH_FACTOR_SCORE)
        .map(|(dimension, _)| *dimension)
}

fn critical_employees(assessments: &[RiskAssessment]) -> Vec<CriticalEmployee> {
    let mut critical: Vec<&RiskAssessment> = assessments
        .iter()
        .filter(|item| item.score > CRITICAL_EMPLOYEE_SCORE)
        .collect();
    critical.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });

    critical
        .into_iter()
        .take(CRITICAL_EMPLOYEE_LIMIT)
        .map(|item| CriticalEmployee {
            employee_id: item.employee_id.clone(),
            department: item.department.clone(),
            score: item.score,
            risk_level: item.risk_level,
            factors: high_factors(item).collect(),
        })
        .collect()
}

fn factor_patterns(assessments: &[RiskAssessment]) -> Vec<FactorPattern> {
    let mut counts: BTreeMap<Dimension, usize> = BTreeMap::new();
    for dimension in assessments.iter().flat_map(high_factors) {
        *counts.entry(dimension).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count >= FACTOR_PATTERN_MIN_EMPLOYEES)
        .map(|(factor, count)| FactorPattern {
            factor,
            affected_employees: count,
            percentage: round_one(count as f64 * 100.0 / assessments.len() as f64),
        })
        .collect()
}

fn department_rollups(assessments: &[RiskAssessment]) -> Vec<DepartmentRollup> {
    let mut grouped: BTreeMap<&str, Vec<&RiskAssessment>> = BTreeMap::new();
    for assessment in assessments {
        let department = assessment
            .department
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNASSIGNED);
        grouped.entry(department).or_default().push(assessment);
    }

    grouped
        .into_iter()
        .map(|(department, members)| {
            let scores: Vec<u8> = members.iter().map(|item| item.score).collect();
            let average = mean(&scores);
            let high_risk_count = members
                .iter()
                .filter(|item| item.risk_level.is_high_risk())
                .count();
            let highest = members.iter().max_by_key(|item| item.score);

            DepartmentRollup {
                department: department.to_string(),
                count: members.len(),
                average_score: round_one(average),
                high_risk_count,
                high_risk_pct: round_one(high_risk_count as f64 * 100.0 / members.len() as f64),
                highest_risk_employee: highest.map(|item| item.employee_id.clone()),
                highest_score: highest.map(|item| item.score).unwrap_or(0),
                risk_level: RiskLevel::from_score(average.round() as u8),
            }
        })
        .collect()
}

fn organization_recommendations(
    assessments: &[RiskAssessment],
    level_counts: &BTreeMap<RiskLevel, usize>,
    hotspots: &[Hotspot],
) -> Vec<String> {
    if assessments.is_empty() {
        return Vec::new();
    }

    let mut recommendations = Vec::new();

    let critical = level_counts.get(&RiskLevel::Critical).copied().unwrap_or(0);
    if critical > 0 {
        recommendations.push(format!(
            "Hold retention conversations with the {critical} critical-risk employee(s) this week"
        ));
    }

    if !hotspots.is_empty() {
        let names: Vec<&str> = hotspots.iter().map(|spot| spot.department.as_str()).collect();
        recommendations.push(format!(
            "Prioritise retention reviews in {}",
            names.join(", ")
        ));
    }

    let high_risk = assessments
        .iter()
        .filter(|item| item.risk_level.is_high_risk())
        .count();
    if high_risk as f64 * 100.0 / assessments.len() as f64 >= ORG_HIGH_RISK_PCT {
        recommendations.push("Launch an organisation-wide retention programme".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("Maintain quarterly risk reviews".to_string());
    }

    recommendations
}
