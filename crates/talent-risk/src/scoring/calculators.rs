use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::config::{band_score, step_total, CalculatorTables};
use super::domain::{Employee, RiskFactors, SkillRarity};

/// Scored dimension. Declaration order is the fixed order used for recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Compensation,
    Engagement,
    MarketDemand,
    Tenure,
    Performance,
    SkillObsolescence,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Compensation,
        Dimension::Engagement,
        Dimension::MarketDemand,
        Dimension::Tenure,
        Dimension::Performance,
        Dimension::SkillObsolescence,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Dimension::Compensation => "compensation",
            Dimension::Engagement => "engagement",
            Dimension::MarketDemand => "market_demand",
            Dimension::Tenure => "tenure",
            Dimension::Performance => "performance",
            Dimension::SkillObsolescence => "skill_obsolescence",
        }
    }

    /// Flag raised when this dimension's sub-score runs hot.
    pub const fn flag(self) -> &'static str {
        match self {
            Dimension::Compensation => "compensation_risk",
            Dimension::Engagement => "engagement_risk",
            Dimension::MarketDemand => "market_demand_risk",
            Dimension::Tenure => "tenure_risk",
            Dimension::Performance => "performance_risk",
            Dimension::SkillObsolescence => "skill_obsolescence_risk",
        }
    }

    /// Resolves a calculator reference from a custom definition.
    ///
    /// Accepts `market_demand`, `marketDemand`, `marketDemandRisk` and similar spellings,
    /// plus the short `skills` / `market` forms.
    pub fn from_reference(reference: &str) -> Option<Self> {
        let normalized: String = reference
            .trim()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-' && !ch.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let normalized = normalized.strip_suffix("risk").unwrap_or(&normalized);

        match normalized {
            "tenure" => Some(Dimension::Tenure),
            "performance" => Some(Dimension::Performance),
            "engagement" => Some(Dimension::Engagement),
            "marketdemand" | "market" => Some(Dimension::MarketDemand),
            "skillobsolescence" | "skills" | "skill" => Some(Dimension::SkillObsolescence),
            "compensation" => Some(Dimension::Compensation),
            _ => None,
        }
    }
}

/// Values derived once per assessment and shared by every calculator.
pub(crate) struct ScoreInputs<'a> {
    pub employee: &'a Employee,
    pub factors: &'a RiskFactors,
    pub tenure_months: Option<f64>,
    pub performance_pct: Option<f64>,
    pub last_promotion_months: Option<f64>,
}

impl<'a> ScoreInputs<'a> {
    pub fn new(employee: &'a Employee, factors: &'a RiskFactors, as_of: NaiveDate) -> Self {
        Self {
            employee,
            factors,
            tenure_months: employee.tenure_months_at(as_of),
            performance_pct: employee.performance_pct(),
            last_promotion_months: factors
                .last_promotion_months
                .or(employee.last_promotion_months),
        }
    }

    /// Number of calculator inputs that carry real data, out of `TRACKED_INPUTS`.
    pub fn present_inputs(&self) -> usize {
        [
            self.tenure_months.is_some(),
            self.performance_pct.is_some(),
            self.employee.engagement_score.is_some(),
            self.employee.comp_ratio.is_some(),
            self.factors.market_demand.is_some(),
            !self.employee.critical_skills.is_empty(),
            self.last_promotion_months.is_some(),
            self.factors.months_since_raise.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

pub(crate) const TRACKED_INPUTS: usize = 8;

pub(crate) fn calculate(
    dimension: Dimension,
    inputs: &ScoreInputs<'_>,
    tables: &CalculatorTables,
) -> f64 {
    let raw = match dimension {
        Dimension::Tenure => tenure(inputs, tables),
        Dimension::Performance => performance(inputs, tables),
        Dimension::Engagement => engagement(inputs, tables),
        Dimension::MarketDemand => market_demand(inputs, tables),
        Dimension::SkillObsolescence => skill_obsolescence(inputs, tables),
        Dimension::Compensation => compensation(inputs, tables),
    };
    raw.clamp(0.0, 100.0)
}

fn tenure(inputs: &ScoreInputs<'_>, tables: &CalculatorTables) -> f64 {
    match inputs.tenure_months {
        Some(months) => band_score(&tables.tenure.bands, months, tables.tenure.beyond),
        None => tables.missing_score,
    }
}

fn performance(inputs: &ScoreInputs<'_>, tables: &CalculatorTables) -> f64 {
    match inputs.performance_pct {
        Some(pct) => (100.0 - pct).max(tables.performance.top_performer_floor),
        None => tables.missing_score,
    }
}

fn engagement(inputs: &ScoreInputs<'_>, tables: &CalculatorTables) -> f64 {
    let table = &tables.engagement;
    let engagement = inputs
        .employee
        .engagement_score
        .unwrap_or(table.default_engagement);

    let mut risk = 100.0 - engagement;
    if let Some(months) = inputs.last_promotion_months {
        risk += step_total(&table.promotion_steps, months);
    }
    if let Some(hours) = inputs.factors.training_hours {
        if hours < table.low_training_hours {
            risk += table.low_training_penalty;
        }
    }
    risk
}

fn market_demand(inputs: &ScoreInputs<'_>, tables: &CalculatorTables) -> f64 {
    let table = &tables.market;
    let factors = inputs.factors;

    let mut risk = factors.market_demand.unwrap_or(table.default_demand);
    risk += table.per_skill_bonus
        * matching_skills(&inputs.employee.critical_skills, &table.demand_keywords) as f64;

    risk += match factors.skill_rarity {
        Some(SkillRarity::Rare) => table.rare_bonus,
        Some(SkillRarity::Specialized) => table.specialized_bonus,
        Some(SkillRarity::Common) | None => 0.0,
    };

    if let Some(contacts) = factors.recruiter_contacts {
        risk += step_total(&table.recruiter_steps, f64::from(contacts));
    }
    if let Some(offers) = factors.competitor_offers {
        risk += step_total(&table.competitor_steps, f64::from(offers));
    }
    risk
}

fn skill_obsolescence(inputs: &ScoreInputs<'_>, tables: &CalculatorTables) -> f64 {
    let table = &tables.obsolescence;
    let employee = inputs.employee;

    let legacy = matching_skills(&employee.critical_skills, &table.legacy_keywords) as f64;
    let gaps = (employee.skill_gaps.len() as f64 * table.per_gap_bonus).min(table.gap_bonus_cap);

    table.base + legacy * table.per_legacy_bonus + gaps
}

fn compensation(inputs: &ScoreInputs<'_>, tables: &CalculatorTables) -> f64 {
    let table = &tables.compensation;
    let mut risk = match inputs.employee.comp_ratio {
        Some(ratio) => band_score(&table.bands, ratio, table.beyond),
        None => tables.missing_score,
    };
    if let Some(months) = inputs.factors.months_since_raise {
        risk += step_total(&table.raise_steps, months);
    }
    risk
}

/// Counts skills containing any keyword, ignoring case. Each skill counts once.
pub(crate) fn matching_skills<'a, I>(skills: I, keywords: &[String]) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    let keywords: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();

    skills
        .into_iter()
        .filter(|skill| {
            let skill = skill.to_lowercase();
            keywords.iter().any(|keyword| skill.contains(keyword.as_str()))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn score(dimension: Dimension, employee: &Employee, factors: &RiskFactors) -> f64 {
        let inputs = ScoreInputs::new(employee, factors, as_of());
        calculate(dimension, &inputs, &CalculatorTables::default())
    }

    #[test]
    fn references_resolve_across_spellings() {
        assert_eq!(
            Dimension::from_reference("marketDemandRisk"),
            Some(Dimension::MarketDemand)
        );
        assert_eq!(
            Dimension::from_reference("skill_obsolescence"),
            Some(Dimension::SkillObsolescence)
        );
        assert_eq!(Dimension::from_reference("Tenure"), Some(Dimension::Tenure));
        assert_eq!(Dimension::from_reference("astrology"), None);
    }

    #[test]
    fn missing_inputs_fall_back_to_neutral_scores() {
        let employee = Employee::new("EMP1");
        let factors = RiskFactors::default();

        assert_eq!(score(Dimension::Tenure, &employee, &factors), 50.0);
        assert_eq!(score(Dimension::Performance, &employee, &factors), 50.0);
        assert_eq!(score(Dimension::Engagement, &employee, &factors), 50.0);
        assert_eq!(score(Dimension::MarketDemand, &employee, &factors), 40.0);
        assert_eq!(score(Dimension::SkillObsolescence, &employee, &factors), 20.0);
        assert_eq!(score(Dimension::Compensation, &employee, &factors), 50.0);
    }

    #[test]
    fn tenure_bands_include_stagnation_uptick() {
        let factors = RiskFactors::default();
        let mut employee = Employee::new("EMP1");

        for (months, expected) in [(2.0, 80.0), (8.0, 55.0), (24.0, 35.0), (60.0, 15.0), (120.0, 25.0)] {
            employee.tenure_months = Some(months);
            assert_eq!(score(Dimension::Tenure, &employee, &factors), expected, "{months} months");
        }
    }

    #[test]
    fn top_performers_keep_residual_risk() {
        let factors = RiskFactors::default();
        let mut employee = Employee::new("EMP1");
        employee.performance_rating = Some(5.0);
        assert_eq!(score(Dimension::Performance, &employee, &factors), 12.0);

        employee.performance_rating = Some(2.0);
        assert_eq!(score(Dimension::Performance, &employee, &factors), 60.0);
    }

    #[test]
    fn stalled_promotion_and_low_training_raise_engagement_risk() {
        let mut employee = Employee::new("EMP1");
        employee.engagement_score = Some(70.0);
        employee.last_promotion_months = Some(40.0);
        let factors = RiskFactors {
            training_hours: Some(8.0),
            ..RiskFactors::default()
        };

        assert_eq!(score(Dimension::Engagement, &employee, &factors), 30.0 + 25.0 + 10.0);
    }

    #[test]
    fn factor_promotion_months_override_the_record() {
        let mut employee = Employee::new("EMP1");
        employee.engagement_score = Some(70.0);
        employee.last_promotion_months = Some(40.0);
        let factors = RiskFactors {
            last_promotion_months: Some(6.0),
            ..RiskFactors::default()
        };

        assert_eq!(score(Dimension::Engagement, &employee, &factors), 30.0);
    }

    #[test]
    fn market_demand_stacks_bonuses_and_clamps() {
        let mut employee = Employee::new("EMP1");
        employee.critical_skills = ["Machine Learning", "Cloud Architecture"]
            .iter()
            .map(|skill| skill.to_string())
            .collect();
        let factors = RiskFactors {
            market_demand: Some(60.0),
            skill_rarity: Some(SkillRarity::Rare),
            recruiter_contacts: Some(3),
            competitor_offers: Some(2),
            ..RiskFactors::default()
        };

        assert_eq!(score(Dimension::MarketDemand, &employee, &factors), 100.0);
    }

    #[test]
    fn demand_keywords_match_by_substring_only() {
        let mut employee = Employee::new("EMP1");
        employee.critical_skills = ["Machine Learning".to_string()].into_iter().collect();
        let factors = RiskFactors::default();
        assert_eq!(score(Dimension::MarketDemand, &employee, &factors), 50.0);

        employee.critical_skills = ["Negotiation".to_string()].into_iter().collect();
        assert_eq!(score(Dimension::MarketDemand, &employee, &factors), 40.0);
    }

    #[test]
    fn skill_gap_bonus_is_capped() {
        let mut employee = Employee::new("EMP1");
        employee.critical_skills = ["COBOL".to_string()].into_iter().collect();
        employee.skill_gaps = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|gap| gap.to_string())
            .collect();

        let factors = RiskFactors::default();
        assert_eq!(
            score(Dimension::SkillObsolescence, &employee, &factors),
            20.0 + 15.0 + 30.0
        );
    }

    #[test]
    fn compensation_bands_add_raise_staleness() {
        let mut employee = Employee::new("EMP1");
        employee.comp_ratio = Some(0.75);
        let factors = RiskFactors {
            months_since_raise: Some(30.0),
            ..RiskFactors::default()
        };
        assert_eq!(score(Dimension::Compensation, &employee, &factors), 85.0);

        employee.comp_ratio = Some(1.4);
        assert_eq!(score(Dimension::Compensation, &employee, &RiskFactors::default()), 5.0);
    }

    #[test]
    fn present_inputs_counts_supplied_fields() {
        let mut employee = Employee::new("EMP1");
        let factors = RiskFactors::default();
        assert_eq!(ScoreInputs::new(&employee, &factors, as_of()).present_inputs(), 0);

        employee.tenure_months = Some(12.0);
        employee.comp_ratio = Some(1.0);
        assert_eq!(ScoreInputs::new(&employee, &factors, as_of()).present_inputs(), 2);
    }
}
