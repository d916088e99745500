use std::collections::BTreeMap;

use super::assessment::AppliedAdjustment;
use super::calculators::{calculate, Dimension, ScoreInputs};
use super::config::ScoringConfig;
use super::registry::{AlgorithmConfig, Modifier};

const SENIOR_TENURE_MONTHS: f64 = 60.0;
const MID_TENURE_MONTHS: f64 = 36.0;
const TREND_WINDOW: usize = 3;

pub(crate) struct Aggregation {
    pub score: u8,
    pub factors: BTreeMap<Dimension, f64>,
    pub triggered_rules: Vec<String>,
    pub modifier_log: Vec<AppliedAdjustment>,
}

/// Runs the weighted mean and every post-aggregation step in their fixed order.
pub(crate) fn aggregate(
    algorithm: &AlgorithmConfig,
    inputs: &ScoreInputs<'_>,
    config: &ScoringConfig,
) -> Aggregation {
    let total_weight: f64 = algorithm.weights.iter().map(|factor| factor.weight).sum();
    let mut factors = BTreeMap::new();
    let mut weighted = 0.0;
    for factor in &algorithm.weights {
        let sub_score = calculate(factor.dimension, inputs, &config.tables);
        factors.insert(factor.dimension, sub_score);
        if total_weight.is_finite() && total_weight > 0.0 {
            weighted += sub_score * (factor.weight / total_weight);
        }
    }

    // Shares keep the sum bounded by the largest sub-score.
    let mut score = if total_weight.is_finite() && total_weight > 0.0 {
        weighted
    } else {
        config.tables.missing_score
    };
    let mut modifier_log = Vec::new();

    if algorithm.features.trend {
        if let Some(factor) =
            trend_factor(&inputs.factors.historical_scores, config.trend_factor_limit)
        {
            score *= 1.0 + factor;
            modifier_log.push(AppliedAdjustment::multiplier("trend", 1.0 + factor));
        }
    }

    if algorithm.features.department_multiplier {
        let multiplier = config.department_multiplier(inputs.employee.department.as_deref());
        if (multiplier - 1.0).abs() > f64::EPSILON {
            score *= multiplier;
            modifier_log.push(AppliedAdjustment::multiplier(
                "department_multiplier",
                multiplier,
            ));
        }
    }

    for modifier in &algorithm.modifiers {
        if let Some((name, multiplier)) = modifier_multiplier(*modifier, inputs) {
            score *= multiplier;
            modifier_log.push(AppliedAdjustment::multiplier(name, multiplier));
        }
    }

    let mut triggered_rules = Vec::new();
    for rule in &algorithm.rules {
        if rule.condition.holds(inputs) {
            score += rule.adjustment;
            triggered_rules.push(rule.name.clone());
            modifier_log.push(AppliedAdjustment::additive(
                format!("rule:{}", rule.name),
                rule.adjustment,
            ));
        }
    }

    if algorithm.features.critical_bump && !inputs.factors.immediate_signals().is_empty() {
        score += config.critical_signal_bump;
        modifier_log.push(AppliedAdjustment::additive(
            "critical_signal",
            config.critical_signal_bump,
        ));
    }

    Aggregation {
        score: finalize(score),
        factors,
        triggered_rules,
        modifier_log,
    }
}

/// The only place a fractional score becomes the public integer.
fn finalize(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    // Snap float noise from the weighted mean so x.5 always rounds up.
    let snapped = (score.clamp(0.0, 100.0) * 1e6).round() / 1e6;
    snapped.round() as u8
}

/// Relative change of the latest score against the mean of the preceding window.
pub(crate) fn trend_factor(history: &[f64], limit: f64) -> Option<f64> {
    let (latest, prior) = history.split_last()?;
    if prior.is_empty() {
        return None;
    }

    let window = &prior[prior.len().saturating_sub(TREND_WINDOW)..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    if mean <= 0.0 || !mean.is_finite() || !latest.is_finite() {
        return None;
    }

    Some(((latest - mean) / mean).clamp(-limit, limit))
}

fn modifier_multiplier(modifier: Modifier, inputs: &ScoreInputs<'_>) -> Option<(&'static str, f64)> {
    match modifier {
        Modifier::SeniorityDiscount => match inputs.tenure_months {
            Some(months) if months >= SENIOR_TENURE_MONTHS => Some(("seniority_discount", 0.8)),
            Some(months) if months >= MID_TENURE_MONTHS => Some(("seniority_discount", 0.9)),
            _ => None,
        },
        Modifier::CriticalRoleProtection if inputs.factors.is_critical_role => {
            Some(("critical_role_protection", 1.2))
        }
        Modifier::CriticalRoleProtection => None,
    }
}
