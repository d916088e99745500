use crate::infra::{build_engine, demo_roster, InMemoryEmployeeRepository};
use clap::Args;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use talent_risk::config::{AppConfig, ScoringSettings};
use talent_risk::error::AppError;
use talent_risk::scoring::{
    BatchOutcome, BatchSummary, CustomAlgorithmDefinition, CustomFactor, EmployeeId,
    OrganizationRiskReport, RiskAssessment, RiskEngine, RiskFactors,
};
use talent_risk::workforce::{
    AssessmentRequest, EmployeeCsvImporter, EmployeeFilter, EmployeeSort, RiskService,
};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV roster with employeeId,name,department,role,... headers
    #[arg(long)]
    pub(crate) employees: PathBuf,
    /// Algorithm to apply to every employee (defaults to auto-selection)
    #[arg(long)]
    pub(crate) algorithm: Option<String>,
    /// Print assessments as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Algorithm used for the demo assessments (defaults to auto-selection)
    #[arg(long)]
    pub(crate) algorithm: Option<String>,
    /// Skip the custom algorithm registration step
    #[arg(long)]
    pub(crate) skip_custom: bool,
}

fn scoring_settings() -> Result<ScoringSettings, AppError> {
    Ok(AppConfig::load()?.scoring)
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        employees,
        algorithm,
        json,
    } = args;

    let engine = build_engine(&scoring_settings()?)?;
    let roster = EmployeeCsvImporter::from_path(&employees)?;
    let outcomes = engine.score_many(&roster, &BTreeMap::new(), algorithm.as_deref());
    let summary = BatchSummary::from_outcomes(&outcomes);

    if json {
        let payload = json!({
            "summary": summary,
            "results": outcomes.iter().map(outcome_view).collect::<Vec<_>>(),
        });
        println!("{payload:#}");
        return Ok(());
    }

    println!(
        "Scored {} employees from {} ({} failed)",
        summary.total,
        employees.display(),
        summary.failed
    );
    for outcome in &outcomes {
        match &outcome.result {
            Ok(assessment) => render_assessment_line(assessment),
            Err(err) => println!("  {:<10} error: {}", outcome.employee_id, err),
        }
    }

    let assessments: Vec<RiskAssessment> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok())
        .collect();
    render_report(&OrganizationRiskReport::from_assessments(&assessments));
    Ok(())
}

pub(crate) fn run_algorithms() -> Result<(), AppError> {
    let engine = build_engine(&scoring_settings()?)?;
    render_algorithms(&engine);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        algorithm,
        skip_custom,
    } = args;

    println!("Talent risk demo");
    let repository = Arc::new(InMemoryEmployeeRepository::seeded(demo_roster()?)?);
    let service = RiskService::new(repository, RiskEngine::default());
    render_algorithms(&service.engine());

    println!("\nAssessing the demo roster");
    let employees = service.list_employees(&EmployeeFilter::default(), EmployeeSort::Name)?;
    for employee in &employees {
        let request = AssessmentRequest {
            algorithm: algorithm.clone(),
            factors: demo_factors(&employee.id),
            persist: true,
        };
        let assessment = service.assess(&employee.id, &request)?;
        render_assessment_line(&assessment);
    }

    println!("\nStored records by risk");
    for employee in service.list_employees(&EmployeeFilter::default(), EmployeeSort::default())? {
        println!(
            "  {:<10} {:<18} {:>3} {}",
            employee.id,
            employee.name.as_deref().unwrap_or("-"),
            employee
                .risk_score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_string()),
            employee
                .risk_level
                .map(|level| level.label())
                .unwrap_or("UNSCORED")
        );
    }

    let report = service.organization_report(None, algorithm.as_deref())?;
    render_report(&report);

    if let Some(hotspot) = report.departments.iter().max_by(|a, b| {
        a.average_score
            .partial_cmp(&b.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    }) {
        if let Some(employee_id) = &hotspot.highest_risk_employee {
            let comparison = service.compare(employee_id, &demo_factors(employee_id))?;
            println!(
                "\nAlgorithm comparison for {} (avg {:.1}, variance {:.2})",
                employee_id, comparison.meta.average, comparison.meta.variance
            );
            for result in &comparison.results {
                println!(
                    "  - {:<12} {:>3} {}",
                    result.algorithm,
                    result.score,
                    result.risk_level.label()
                );
            }
        }
    }

    if skip_custom {
        return Ok(());
    }

    println!("\nRegistering custom algorithm 'pay-and-mood'");
    let summary = service.register_algorithm(pay_and_mood_definition())?;
    println!(
        "  dimensions: {}",
        summary
            .dimensions
            .iter()
            .map(|dimension| dimension.label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let assessment = service.assess(
        &EmployeeId::from("EMP1006"),
        &AssessmentRequest {
            algorithm: Some(summary.name.clone()),
            factors: RiskFactors::default(),
            persist: false,
        },
    )?;
    render_assessment_line(&assessment);

    Ok(())
}

/// Contextual signals attached to a few demo employees.
fn demo_factors(id: &EmployeeId) -> RiskFactors {
    match id.as_str() {
        "EMP1001" => RiskFactors {
            recruiter_contacts: Some(4),
            resume_update_recent: true,
            historical_scores: vec![48.0, 55.0, 63.0],
            ..RiskFactors::default()
        },
        "EMP1003" => RiskFactors {
            market_demand: Some(85.0),
            competitor_offers: Some(1),
            ..RiskFactors::default()
        },
        "EMP1004" => RiskFactors {
            is_critical_role: true,
            ..RiskFactors::default()
        },
        "EMP1005" => {
            let mut factors = RiskFactors::default();
            factors
                .extra
                .insert("quotaAchievement".to_string(), json!(134));
            factors
        }
        _ => RiskFactors::default(),
    }
}

fn pay_and_mood_definition() -> CustomAlgorithmDefinition {
    CustomAlgorithmDefinition {
        name: "pay-and-mood".to_string(),
        description: Some("Engagement-led model with a pay check".to_string()),
        factors: vec![
            CustomFactor {
                calculator: "engagement".to_string(),
                weight: json!(3),
            },
            CustomFactor {
                calculator: "compensation".to_string(),
                weight: json!(1),
            },
        ],
        rules: Vec::new(),
        presets: Vec::new(),
        modifiers: Vec::new(),
        department: None,
        role_keyword: None,
        features: Default::default(),
    }
}

fn outcome_view(outcome: &BatchOutcome) -> serde_json::Value {
    match &outcome.result {
        Ok(assessment) => json!({
            "employeeId": outcome.employee_id,
            "success": true,
            "assessment": assessment,
        }),
        Err(err) => json!({
            "employeeId": outcome.employee_id,
            "success": false,
            "error": err.to_string(),
        }),
    }
}

fn render_algorithms(engine: &RiskEngine) {
    println!("Registered algorithms");
    for summary in engine.list_algorithms() {
        let binding = match (&summary.department, &summary.role_keyword) {
            (Some(department), _) => format!(" [department: {department}]"),
            (None, Some(keyword)) => format!(" [role: {keyword}]"),
            (None, None) => String::new(),
        };
        println!("  - {}{}: {}", summary.name, binding, summary.description);
    }
}

fn render_assessment_line(assessment: &RiskAssessment) {
    let flags: Vec<&str> = assessment.flags.iter().map(String::as_str).collect();
    println!(
        "  {:<10} {:>3} {:<9} via {:<11} confidence {:>3}% | {}",
        assessment.employee_id,
        assessment.score,
        assessment.risk_level.label(),
        assessment.algorithm_used,
        assessment.confidence,
        if flags.is_empty() {
            "no flags".to_string()
        } else {
            flags.join(", ")
        }
    );
    if let Some(first) = assessment.recommendations.first() {
        println!("             next step: {first}");
    }
}

fn render_report(report: &OrganizationRiskReport) {
    println!(
        "\nOrganization: {} assessed | avg {:.1} | median {:.1} | {} high risk",
        report.total,
        report.average_score,
        report.median_score,
        report.high_risk_count()
    );
    println!("Distribution:");
    for bucket in &report.distribution {
        println!("  {:>6}: {}", bucket.range, bucket.count);
    }
    println!("Departments:");
    for rollup in &report.departments {
        println!(
            "  - {}: {} employees | avg {:.1} | {:.0}% high risk | {}",
            rollup.department,
            rollup.count,
            rollup.average_score,
            rollup.high_risk_pct,
            rollup.risk_level.label()
        );
    }
    if !report.hotspots.is_empty() {
        println!("Hotspots:");
        for hotspot in &report.hotspots {
            println!(
                "  - {} (avg {:.1}, {:.0}% high risk)",
                hotspot.department, hotspot.average_score, hotspot.high_risk_pct
            );
        }
    }
    println!("Recommendations:");
    for recommendation in &report.recommendations {
        println!("  - {recommendation}");
    }
}
