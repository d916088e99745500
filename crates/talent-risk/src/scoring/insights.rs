use std::collections::{BTreeMap, BTreeSet};

use super::assessment::{Insight, InsightLevel, TrendAnalysis, TrendDirection};
use super::calculators::{Dimension, ScoreInputs};
use super::config::CalculatorTables;
use super::domain::SkillRarity;

const HOT_FACTOR: f64 = 70.0;
const URGENT_SCORE: u8 = 70;
const DEVELOPMENTAL_SCORE: u8 = 50;
const NEW_HIRE_MONTHS: f64 = 12.0;
const STALE_RAISE_MONTHS: f64 = 24.0;
const STALLED_PROMOTION_MONTHS: f64 = 36.0;
const TREND_WINDOW: usize = 3;

const URGENT_ACTIONS: [&str; 3] = [
    "Schedule a retention conversation within 48 hours",
    "Review compensation against market immediately",
    "Escalate to the HR business partner",
];

const DEVELOPMENTAL_ACTIONS: [&str; 2] = [
    "Discuss career development goals in the next one-on-one",
    "Build an individual development plan",
];

fn dimension_action(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Compensation => "Benchmark pay against market and plan an adjustment",
        Dimension::Engagement => "Run a stay interview to surface engagement blockers",
        Dimension::MarketDemand => "Consider a retention bonus or equity refresh",
        Dimension::Tenure => "Pair with a mentor and check onboarding progress",
        Dimension::Performance => "Agree a performance support plan with clear goals",
        Dimension::SkillObsolescence => "Fund training on in-demand skills",
    }
}

fn hot_dimensions(factors: &BTreeMap<Dimension, f64>) -> impl Iterator<Item = Dimension> + '_ {
    factors
        .iter()
        .filter(|(_, score)| **score > HOT_FACTOR)
        .map(|(dimension, _)| *dimension)
}

pub(crate) fn flags(
    factors: &BTreeMap<Dimension, f64>,
    inputs: &ScoreInputs<'_>,
    tables: &CalculatorTables,
) -> BTreeSet<String> {
    let mut flags: BTreeSet<String> = hot_dimensions(factors)
        .map(|dimension| dimension.flag().to_string())
        .collect();

    let employee = inputs.employee;
    let raw = inputs.factors;
    let mut named = Vec::new();

    if employee
        .comp_ratio
        .is_some_and(|ratio| ratio < tables.compensation.underpaid_ratio)
    {
        named.push("underpaid");
    }
    if raw
        .months_since_raise
        .is_some_and(|months| months > STALE_RAISE_MONTHS)
    {
        named.push("no_recent_raise");
    }
    if raw.recruiter_contacts.is_some_and(|contacts| contacts > 0) {
        named.push("recruiter_attention");
    }
    if raw.skill_rarity == Some(SkillRarity::Rare) {
        named.push("high_demand_skills");
    }
    if inputs
        .last_promotion_months
        .is_some_and(|months| months > STALLED_PROMOTION_MONTHS)
    {
        named.push("promotion_stalled");
    }
    if inputs
        .tenure_months
        .is_some_and(|months| months < NEW_HIRE_MONTHS)
    {
        named.push("new_hire");
    }
    if inputs
        .performance_pct
        .is_some_and(|pct| pct >= tables.performance.top_performer_pct)
    {
        named.push("top_performer_flight_risk");
    }
    named.extend(raw.immediate_signals());
    if raw.is_critical_role {
        named.push("critical_role");
    }

    flags.extend(named.into_iter().map(str::to_string));
    flags
}

/// Urgent tier, then developmental tier, then per-dimension actions; first occurrence wins.
pub(crate) fn recommendations(score: u8, factors: &BTreeMap<Dimension, f64>) -> Vec<String> {
    let mut actions: Vec<&str> = Vec::new();

    if score >= URGENT_SCORE {
        actions.extend(URGENT_ACTIONS);
    } else if score >= DEVELOPMENTAL_SCORE {
        actions.extend(DEVELOPMENTAL_ACTIONS);
    }

    for dimension in Dimension::ALL {
        if factors.get(&dimension).is_some_and(|score| *score > HOT_FACTOR) {
            actions.push(dimension_action(dimension));
        }
    }

    let mut seen = BTreeSet::new();
    actions
        .into_iter()
        .filter(|action| seen.insert(*action))
        .map(str::to_string)
        .collect()
}

pub(crate) fn trend_analysis(history: &[f64], current: u8) -> Option<TrendAnalysis> {
    if history.is_empty() {
        return None;
    }

    let window = &history[history.len().saturating_sub(TREND_WINDOW)..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let change = f64::from(current) - mean;

    Some(TrendAnalysis {
        direction: TrendDirection::from_change(change),
        change: (change * 10.0).round() / 10.0,
        confidence: (history.len() * 20).min(100) as u8,
        historical_count: history.len(),
    })
}

pub(crate) fn insights(
    score: u8,
    factors: &BTreeMap<Dimension, f64>,
    trend: Option<&TrendAnalysis>,
    inputs: &ScoreInputs<'_>,
    tables: &CalculatorTables,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if score >= URGENT_SCORE {
        insights.push(Insight::new(
            InsightLevel::Critical,
            format!("Attrition risk is critical at {score}; intervene this week"),
        ));
    }

    let hot: Vec<&str> = hot_dimensions(factors)
        .map(|dimension| dimension.label())
        .collect();
    if !hot.is_empty() {
        insights.push(Insight::new(
            InsightLevel::Warning,
            format!("High-risk drivers: {}", hot.join(", ")),
        ));
    }

    if let Some(trend) = trend {
        if trend.direction.is_rising() {
            insights.push(Insight::new(
                InsightLevel::Warning,
                format!("Risk is rising ({:+.1} against recent assessments)", trend.change),
            ));
        } else if trend.direction.is_falling() {
            insights.push(Insight::new(
                InsightLevel::Positive,
                format!("Risk is falling ({:+.1} against recent assessments)", trend.change),
            ));
        }
    }

    if let Some(ratio) = inputs.employee.comp_ratio {
        if ratio < tables.compensation.underpaid_ratio {
            insights.push(Insight::new(
                InsightLevel::Warning,
                format!("Pay sits at {:.0}% of the market midpoint", ratio * 100.0),
            ));
        }
    }

    if inputs
        .tenure_months
        .is_some_and(|months| months < NEW_HIRE_MONTHS)
    {
        insights.push(Insight::new(
            InsightLevel::Info,
            "New hire: first-year attrition is historically elevated",
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors(pairs: &[(Dimension, f64)]) -> BTreeMap<Dimension, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn urgent_actions_precede_dimension_actions() {
        let hot = factors(&[
            (Dimension::Tenure, 80.0),
            (Dimension::Compensation, 90.0),
            (Dimension::Performance, 20.0),
        ]);

        let actions = recommendations(72, &hot);
        assert_eq!(actions[0], URGENT_ACTIONS[0]);
        assert_eq!(actions.len(), 5);
        let compensation = actions
            .iter()
            .position(|a| a == dimension_action(Dimension::Compensation))
            .expect("compensation action");
        let tenure = actions
            .iter()
            .position(|a| a == dimension_action(Dimension::Tenure))
            .expect("tenure action");
        assert!(compensation < tenure);
    }

    #[test]
    fn developmental_tier_covers_fifty_to_sixty_nine() {
        let calm = factors(&[(Dimension::Tenure, 35.0)]);
        assert_eq!(recommendations(50, &calm), DEVELOPMENTAL_ACTIONS.map(String::from).to_vec());
        assert_eq!(recommendations(69, &calm).len(), 2);
        assert!(recommendations(49, &calm).is_empty());
    }

    #[test]
    fn trend_analysis_compares_with_last_three_scores() {
        let trend = trend_analysis(&[10.0, 40.0, 50.0, 60.0], 68).expect("trend");
        assert_eq!(trend.change, 18.0);
        assert_eq!(trend.direction, TrendDirection::IncreasingRapidly);
        assert_eq!(trend.confidence, 80);
        assert_eq!(trend.historical_count, 4);

        let flat = trend_analysis(&[50.0], 52).expect("trend");
        assert_eq!(flat.direction, TrendDirection::Stable);
        assert_eq!(flat.confidence, 20);

        assert!(trend_analysis(&[], 52).is_none());
    }
}
