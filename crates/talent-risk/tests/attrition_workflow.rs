//! End-to-end checks over the public API: roster import, batch scoring and reporting.

use std::collections::BTreeMap;
use std::io::Cursor;

use serde_json::json;
use talent_risk::scoring::{
    BatchSummary, EmployeeId, OrganizationRiskReport, RiskEngine, RiskFactors, RiskLevel,
    ScoringConfig, ScoringError,
};
use talent_risk::workforce::EmployeeCsvImporter;

mod common {
    use super::*;

    pub const ROSTER: &str = "\
employeeId,name,department,role,hireDate,tenureMonths,performanceRating,engagementScore,compRatio,criticalSkills,skillGaps
EMP1001,Jordan Blake,Marketing,Data Analyst,,4,1.5,30,0.65,Machine Learning,
EMP1002,Priya Raman,Marketing,Brand Strategist,,48,4.5,85,1.15,,
EMP2001,Chen Wu,Finance,Accountant,,,,,,,
";

    pub fn roster() -> Vec<talent_risk::scoring::Employee> {
        EmployeeCsvImporter::from_reader(Cursor::new(ROSTER)).expect("roster imports")
    }
}

#[test]
fn imported_roster_scores_and_rolls_up() {
    let employees = common::roster();
    assert_eq!(employees.len(), 3);

    let engine = RiskEngine::default();
    let outcomes = engine.score_many(&employees, &BTreeMap::new(), Some("basic"));
    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);

    let scores: Vec<u8> = outcomes
        .iter()
        .filter_map(|outcome| outcome.assessment())
        .map(|assessment| assessment.score)
        .collect();
    assert_eq!(scores, vec![71, 17, 49]);

    let assessments: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok())
        .collect();
    let report = OrganizationRiskReport::from_assessments(&assessments);
    assert_eq!(report.total, 3);
    assert_eq!(report.median_score, 49.0);
    assert_eq!(report.level_counts[&RiskLevel::High], 1);
    assert_eq!(report.level_counts[&RiskLevel::Low], 1);

    let finance = report
        .departments
        .iter()
        .find(|rollup| rollup.department == "Finance")
        .expect("finance rollup");
    assert_eq!(finance.count, 1);
    assert_eq!(finance.highest_risk_employee, Some(EmployeeId::from("EMP2001")));
}

#[test]
fn scoring_config_overrides_the_critical_bump() {
    let config: ScoringConfig =
        serde_json::from_value(json!({ "criticalSignalBump": 30 })).expect("config parses");
    let engine = RiskEngine::new(config).expect("valid config");

    let employees = common::roster();
    let finance = &employees[2];
    let plain = engine
        .score(finance, &RiskFactors::default(), Some("advanced"))
        .expect("plain score");
    let searching = engine
        .score(
            finance,
            &RiskFactors {
                interviewed_recently: true,
                ..RiskFactors::default()
            },
            Some("advanced"),
        )
        .expect("bumped score");

    assert_eq!(searching.score, plain.score + 30);
    assert!(searching.has_flag("recent_interviews"));
}

#[test]
fn unknown_algorithm_is_not_silently_replaced() {
    let employees = common::roster();
    let engine = RiskEngine::default();

    let error = engine
        .score(&employees[0], &RiskFactors::default(), Some("gradient-boost"))
        .expect_err("unregistered algorithm");
    assert_eq!(
        error,
        ScoringError::AlgorithmNotFound {
            name: "gradient-boost".to_string()
        }
    );
}

#[test]
fn roster_with_bad_rating_is_rejected_with_its_line() {
    let roster = format!(
        "{}EMP9,Quinn,Sales,Rep,,10,6.5,50,1.0,,\n",
        common::ROSTER
    );

    let error = EmployeeCsvImporter::from_reader(Cursor::new(roster)).expect_err("bad rating");
    assert!(error.to_string().contains("line 5"));
}
