use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::calculators::Dimension;
use super::conditions::{Condition, ConditionOperator};
use super::config::SelectionPolicy;
use super::domain::Employee;
use super::error::{ConfigurationError, ScoringError};

pub const AUTO_ALGORITHM: &str = "auto";

/// Multiplicative adjustment applied after the department multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// ×0.8 from five years of tenure, ×0.9 from three.
    SeniorityDiscount,
    /// ×1.2 when the caller marks the role as critical.
    CriticalRoleProtection,
}

impl Modifier {
    fn from_reference(reference: &str) -> Option<Self> {
        match reference.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "seniority_discount" | "senioritydiscount" => Some(Modifier::SeniorityDiscount),
            "critical_role_protection" | "criticalroleprotection" => {
                Some(Modifier::CriticalRoleProtection)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedFactor {
    pub dimension: Dimension,
    pub weight: f64,
}

/// Fixed score adjustment applied when its condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub condition: Condition,
    pub adjustment: f64,
}

/// Optional aggregation steps an algorithm opts into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmFeatures {
    pub trend: bool,
    pub department_multiplier: bool,
    pub critical_bump: bool,
}

/// Validated, immutable algorithm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmConfig {
    pub name: String,
    pub description: String,
    pub weights: Vec<WeightedFactor>,
    pub rules: Vec<Rule>,
    pub modifiers: Vec<Modifier>,
    pub department: Option<String>,
    pub role_keyword: Option<String>,
    pub features: AlgorithmFeatures,
    pub builtin: bool,
}

impl AlgorithmConfig {
    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.weights.iter().map(|factor| factor.dimension)
    }

    pub fn summary(&self) -> AlgorithmSummary {
        AlgorithmSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            dimensions: self.dimensions().collect(),
            department: self.department.clone(),
            role_keyword: self.role_keyword.clone(),
            builtin: self.builtin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmSummary {
    pub name: String,
    pub description: String,
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_keyword: Option<String>,
    pub builtin: bool,
}

/// Caller-supplied factor reference. The weight stays untyped until validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFactor {
    pub calculator: String,
    pub weight: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,
    pub condition: Condition,
    pub adjustment: Value,
}

/// Declarative definition accepted by `register_algorithm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAlgorithmDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub factors: Vec<CustomFactor>,
    #[serde(default)]
    pub rules: Vec<CustomRule>,
    /// Named stock rules, e.g. `active_job_search`, appended after `rules`.
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role_keyword: Option<String>,
    #[serde(default)]
    pub features: AlgorithmFeatures,
}

/// Stock rules a custom definition can reference by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePreset {
    ActiveJobSearch,
    RecentResumeUpdate,
    HighLinkedinActivity,
    SignificantlyUnderpaid,
    NoRecentPromotion,
}

impl RulePreset {
    pub const ALL: [RulePreset; 5] = [
        RulePreset::ActiveJobSearch,
        RulePreset::RecentResumeUpdate,
        RulePreset::HighLinkedinActivity,
        RulePreset::SignificantlyUnderpaid,
        RulePreset::NoRecentPromotion,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            RulePreset::ActiveJobSearch => "active_job_search",
            RulePreset::RecentResumeUpdate => "recent_resume_update",
            RulePreset::HighLinkedinActivity => "high_linkedin_activity",
            RulePreset::SignificantlyUnderpaid => "significantly_underpaid",
            RulePreset::NoRecentPromotion => "no_recent_promotion",
        }
    }

    /// Accepts snake_case names and the camelCase spellings of older clients.
    pub fn from_reference(reference: &str) -> Option<Self> {
        let key = reference.trim().to_ascii_lowercase().replace(&['-', '_'][..], "");
        Self::ALL.into_iter().find(|preset| {
            preset.name().replace('_', "") == key
                || matches!(
                    (preset, key.as_str()),
                    (RulePreset::SignificantlyUnderpaid, "underpaid")
                        | (RulePreset::NoRecentPromotion, "nopromotion")
                )
        })
    }

    pub fn rule(self) -> Rule {
        match self {
            RulePreset::ActiveJobSearch => rule(
                self.name(),
                "activeJobSearch",
                ConditionOperator::Eq,
                json!(true),
                20.0,
            ),
            RulePreset::RecentResumeUpdate => rule(
                self.name(),
                "resumeUpdateRecent",
                ConditionOperator::Eq,
                json!(true),
                15.0,
            ),
            RulePreset::HighLinkedinActivity => rule(
                self.name(),
                "linkedinActivity",
                ConditionOperator::Eq,
                json!("high"),
                15.0,
            ),
            RulePreset::SignificantlyUnderpaid => rule(
                self.name(),
                "compRatio",
                ConditionOperator::Lt,
                json!(0.8),
                25.0,
            ),
            RulePreset::NoRecentPromotion => rule(
                self.name(),
                "lastPromotionMonths",
                ConditionOperator::Gt,
                json!(36),
                20.0,
            ),
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Ordered set of named algorithms. Built once, then extended through validated registration.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    algorithms: Vec<AlgorithmConfig>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AlgorithmRegistry {
    pub fn empty() -> Self {
        Self {
            algorithms: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        Self {
            algorithms: builtin_algorithms(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AlgorithmConfig> {
        let name = normalize_name(name);
        self.algorithms.iter().find(|config| config.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlgorithmConfig> {
        self.algorithms.iter()
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    pub fn summaries(&self) -> Vec<AlgorithmSummary> {
        self.algorithms.iter().map(AlgorithmConfig::summary).collect()
    }

    /// Validates the whole definition before touching the registry.
    pub fn register(
        &mut self,
        definition: CustomAlgorithmDefinition,
    ) -> Result<&AlgorithmConfig, ConfigurationError> {
        let config = self.build_custom(definition)?;
        self.algorithms.push(config);
        let index = self.algorithms.len() - 1;
        Ok(&self.algorithms[index])
    }

    fn build_custom(
        &self,
        definition: CustomAlgorithmDefinition,
    ) -> Result<AlgorithmConfig, ConfigurationError> {
        let name = normalize_name(&definition.name);
        if name.is_empty() {
            return Err(ConfigurationError::BlankName);
        }
        if name == AUTO_ALGORITHM {
            return Err(ConfigurationError::ReservedName(name));
        }
        if self.get(&name).is_some() {
            return Err(ConfigurationError::DuplicateName(name));
        }
        if definition.factors.is_empty() {
            return Err(ConfigurationError::NoFactors(name));
        }

        let mut seen = BTreeSet::new();
        let mut weights = Vec::with_capacity(definition.factors.len());
        for factor in &definition.factors {
            let dimension = Dimension::from_reference(&factor.calculator)
                .ok_or_else(|| ConfigurationError::UnknownCalculator(factor.calculator.clone()))?;
            if !seen.insert(dimension) {
                return Err(ConfigurationError::DuplicateCalculator(
                    factor.calculator.clone(),
                ));
            }

            let weight = factor
                .weight
                .as_f64()
                .filter(|weight| weight.is_finite() && *weight >= 0.0)
                .ok_or_else(|| ConfigurationError::InvalidWeight {
                    calculator: factor.calculator.clone(),
                    value: factor.weight.to_string(),
                })?;
            weights.push(WeightedFactor { dimension, weight });
        }

        let total: f64 = weights.iter().map(|factor| factor.weight).sum();
        if total <= 0.0 {
            return Err(ConfigurationError::ZeroTotalWeight(name));
        }
        if !total.is_finite() {
            return Err(ConfigurationError::UnboundedTotalWeight(name));
        }

        let mut rules = Vec::with_capacity(definition.rules.len());
        for rule in definition.rules {
            let rule_name = rule.name.trim().to_string();
            if rule_name.is_empty() {
                return Err(ConfigurationError::InvalidRule {
                    rule: rule.name,
                    reason: "rule name must not be blank".to_string(),
                });
            }
            if let Some(reason) = rule.condition.problem() {
                return Err(ConfigurationError::InvalidRule {
                    rule: rule_name,
                    reason,
                });
            }
            let adjustment = rule
                .adjustment
                .as_f64()
                .filter(|value| value.is_finite())
                .ok_or_else(|| ConfigurationError::InvalidRule {
                    rule: rule_name.clone(),
                    reason: format!("adjustment must be a number, got {}", rule.adjustment),
                })?;
            rules.push(Rule {
                name: rule_name,
                condition: rule.condition,
                adjustment,
            });
        }

        for reference in &definition.presets {
            let preset = RulePreset::from_reference(reference).ok_or_else(|| {
                ConfigurationError::InvalidRule {
                    rule: reference.clone(),
                    reason: "unknown preset".to_string(),
                }
            })?;
            if !rules.iter().any(|existing: &Rule| existing.name == preset.name()) {
                rules.push(preset.rule());
            }
        }

        let mut modifiers = Vec::with_capacity(definition.modifiers.len());
        for reference in &definition.modifiers {
            let modifier = Modifier::from_reference(reference).ok_or_else(|| {
                ConfigurationError::InvalidModifier {
                    modifier: reference.clone(),
                    reason: "unknown modifier".to_string(),
                }
            })?;
            if !modifiers.contains(&modifier) {
                modifiers.push(modifier);
            }
        }

        let description = definition
            .description
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("Custom algorithm {name}"));

        Ok(AlgorithmConfig {
            name,
            description,
            weights,
            rules,
            modifiers,
            department: definition
                .department
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            role_keyword: definition
                .role_keyword
                .map(|value| value.trim().to_ascii_lowercase())
                .filter(|value| !value.is_empty()),
            features: definition.features,
            builtin: false,
        })
    }

    /// Resolves the algorithm to run. `None`, blank and `auto` all trigger auto-selection.
    pub fn select(
        &self,
        requested: Option<&str>,
        employee: &Employee,
        policy: &SelectionPolicy,
    ) -> Result<&AlgorithmConfig, ScoringError> {
        let requested = requested.map(normalize_name).unwrap_or_default();
        if !requested.is_empty() && requested != AUTO_ALGORITHM {
            return self
                .get(&requested)
                .ok_or(ScoringError::AlgorithmNotFound { name: requested });
        }

        if let Some(department) = employee.department.as_deref() {
            let department = department.trim();
            if let Some(config) = self.algorithms.iter().find(|config| {
                config
                    .department
                    .as_deref()
                    .is_some_and(|bound| bound.eq_ignore_ascii_case(department))
            }) {
                return Ok(config);
            }
        }

        if let Some(role) = employee.role.as_deref() {
            let role = role.to_lowercase();
            if let Some(config) = self.algorithms.iter().find(|config| {
                config
                    .role_keyword
                    .as_deref()
                    .is_some_and(|keyword| role.contains(keyword))
            }) {
                return Ok(config);
            }
        }

        let fallback = match employee.risk_score {
            Some(score) if score > policy.high_risk_threshold => &policy.high_risk_algorithm,
            _ => &policy.default_algorithm,
        };

        self.get(fallback)
            .or_else(|| self.get(&policy.default_algorithm))
            .ok_or_else(|| ScoringError::AlgorithmNotFound {
                name: normalize_name(fallback),
            })
    }
}

fn weights(pairs: &[(Dimension, f64)]) -> Vec<WeightedFactor> {
    pairs
        .iter()
        .map(|(dimension, weight)| WeightedFactor {
            dimension: *dimension,
            weight: *weight,
        })
        .collect()
}

fn rule(name: &str, field: &str, operator: ConditionOperator, value: Value, adjustment: f64) -> Rule {
    Rule {
        name: name.to_string(),
        condition: Condition::new(field, operator, value),
        adjustment,
    }
}

fn builtin_algorithms() -> Vec<AlgorithmConfig> {
    use Dimension::*;

    let base = |name: &str, description: &str, pairs: &[(Dimension, f64)]| AlgorithmConfig {
        name: name.to_string(),
        description: description.to_string(),
        weights: weights(pairs),
        rules: Vec::new(),
        modifiers: Vec::new(),
        department: None,
        role_keyword: None,
        features: AlgorithmFeatures::default(),
        builtin: true,
    };

    let basic = base(
        "basic",
        "Weighted blend of tenure, performance, engagement, market and pay",
        &[
            (Tenure, 0.20),
            (Performance, 0.30),
            (Engagement, 0.25),
            (MarketDemand, 0.15),
            (Compensation, 0.10),
        ],
    );

    let advanced = AlgorithmConfig {
        features: AlgorithmFeatures {
            trend: true,
            department_multiplier: true,
            critical_bump: true,
        },
        ..base(
            "advanced",
            "All six dimensions with trend, department and immediate-signal adjustments",
            &[
                (Tenure, 0.15),
                (Performance, 0.25),
                (Engagement, 0.20),
                (MarketDemand, 0.15),
                (Compensation, 0.10),
                (SkillObsolescence, 0.15),
            ],
        )
    };

    let engineering = AlgorithmConfig {
        department: Some("Engineering".to_string()),
        rules: vec![
            rule(
                "active_github",
                "githubActivity",
                ConditionOperator::Eq,
                json!("high"),
                15.0,
            ),
            rule(
                "conference_speaker",
                "conferenceTalks",
                ConditionOperator::Gt,
                json!(0),
                10.0,
            ),
        ],
        ..base(
            "engineering",
            "Market-weighted model for engineering staff",
            &[
                (Tenure, 0.10),
                (Performance, 0.25),
                (MarketDemand, 0.30),
                (Compensation, 0.20),
                (Engagement, 0.15),
            ],
        )
    };

    let sales = AlgorithmConfig {
        department: Some("Sales".to_string()),
        rules: vec![
            rule(
                "top_performer",
                "quotaAchievement",
                ConditionOperator::Gt,
                json!(120),
                -15.0,
            ),
            rule(
                "recent_client_loss",
                "recentClientLosses",
                ConditionOperator::Gt,
                json!(0),
                20.0,
            ),
        ],
        ..base(
            "sales",
            "Performance-led model for quota-carrying roles",
            &[
                (Performance, 0.40),
                (Engagement, 0.25),
                (Tenure, 0.15),
                (MarketDemand, 0.20),
            ],
        )
    };

    let leadership = AlgorithmConfig {
        role_keyword: Some("manager".to_string()),
        modifiers: vec![Modifier::CriticalRoleProtection],
        ..base(
            "leadership",
            "People-manager model with critical-role protection",
            &[
                (Performance, 0.30),
                (Engagement, 0.25),
                (Compensation, 0.20),
                (MarketDemand, 0.15),
                (Tenure, 0.10),
            ],
        )
    };

    vec![basic, advanced, engineering, sales, leadership]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, factors: Value) -> CustomAlgorithmDefinition {
        serde_json::from_value(json!({ "name": name, "factors": factors }))
            .expect("definition parses")
    }

    #[test]
    fn builtins_are_listed_in_registration_order() {
        let registry = AlgorithmRegistry::with_builtins();
        let names: Vec<String> = registry.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["basic", "advanced", "engineering", "sales", "leadership"]
        );
    }

    #[test]
    fn builtin_weights_sum_to_one() {
        for config in AlgorithmRegistry::with_builtins().iter() {
            let total: f64 = config.weights.iter().map(|factor| factor.weight).sum();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {total}", config.name);
        }
    }

    #[test]
    fn explicit_unknown_name_is_not_found() {
        let registry = AlgorithmRegistry::with_builtins();
        let error = registry
            .select(Some("quantum"), &Employee::new("EMP1"), &SelectionPolicy::default())
            .expect_err("unknown algorithm");
        assert_eq!(
            error,
            ScoringError::AlgorithmNotFound {
                name: "quantum".to_string()
            }
        );
    }

    #[test]
    fn auto_selection_prefers_department_then_role_then_history() {
        let registry = AlgorithmRegistry::with_builtins();
        let policy = SelectionPolicy::default();

        let mut employee = Employee::new("EMP1");
        employee.department = Some("engineering".to_string());
        employee.role = Some("Engineering Manager".to_string());
        let selected = registry.select(Some("auto"), &employee, &policy).expect("selected");
        assert_eq!(selected.name, "engineering");

        employee.department = Some("Finance".to_string());
        let selected = registry.select(None, &employee, &policy).expect("selected");
        assert_eq!(selected.name, "leadership");

        employee.role = Some("Analyst".to_string());
        employee.risk_score = Some(61);
        let selected = registry.select(Some(""), &employee, &policy).expect("selected");
        assert_eq!(selected.name, "advanced");

        employee.risk_score = Some(60);
        let selected = registry.select(Some("AUTO"), &employee, &policy).expect("selected");
        assert_eq!(selected.name, "basic");
    }

    #[test]
    fn register_accepts_any_positive_weight_scale() {
        let mut registry = AlgorithmRegistry::with_builtins();
        let config = registry
            .register(definition(
                " Retention-Focus ",
                json!([
                    { "calculator": "engagementRisk", "weight": 3 },
                    { "calculator": "compensation", "weight": 1 }
                ]),
            ))
            .expect("registers");

        assert_eq!(config.name, "retention-focus");
        assert!(!config.builtin);
        assert_eq!(registry.len(), 6);
        assert!(registry.get("RETENTION-FOCUS").is_some());
    }

    #[test]
    fn register_rejects_non_numeric_weight_without_side_effects() {
        let mut registry = AlgorithmRegistry::with_builtins();
        let before = registry.summaries();

        let error = registry
            .register(definition(
                "bad",
                json!([{ "calculator": "tenure", "weight": "heavy" }]),
            ))
            .expect_err("string weight rejected");

        assert!(matches!(error, ConfigurationError::InvalidWeight { .. }));
        assert_eq!(registry.summaries(), before);
    }

    #[test]
    fn register_rejects_structural_problems() {
        let mut registry = AlgorithmRegistry::with_builtins();

        let cases = [
            definition("", json!([{ "calculator": "tenure", "weight": 1 }])),
            definition("auto", json!([{ "calculator": "tenure", "weight": 1 }])),
            definition("basic", json!([{ "calculator": "tenure", "weight": 1 }])),
            definition("empty", json!([])),
            definition("zero", json!([{ "calculator": "tenure", "weight": 0 }])),
            definition("negative", json!([{ "calculator": "tenure", "weight": -1 }])),
            definition("mystery", json!([{ "calculator": "horoscope", "weight": 1 }])),
            definition(
                "twice",
                json!([
                    { "calculator": "tenure", "weight": 1 },
                    { "calculator": "tenureRisk", "weight": 1 }
                ]),
            ),
        ];

        for case in cases {
            let name = case.name.clone();
            assert!(registry.register(case).is_err(), "'{name}' should be rejected");
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn register_rejects_weights_that_overflow_their_total() {
        let mut registry = AlgorithmRegistry::with_builtins();

        let error = registry
            .register(definition(
                "huge",
                json!([
                    { "calculator": "tenure", "weight": 1e308 },
                    { "calculator": "performance", "weight": 1e308 }
                ]),
            ))
            .expect_err("infinite total rejected");

        assert_eq!(
            error,
            ConfigurationError::UnboundedTotalWeight("huge".to_string())
        );
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn presets_expand_to_stock_rules() {
        let mut registry = AlgorithmRegistry::with_builtins();
        let mut preset_definition =
            definition("signals", json!([{ "calculator": "engagement", "weight": 1 }]));
        preset_definition.presets = vec![
            "activeJobSearch".to_string(),
            "significantly_underpaid".to_string(),
            "active-job-search".to_string(),
        ];

        let config = registry.register(preset_definition).expect("registers");
        let rules: Vec<(&str, f64)> = config
            .rules
            .iter()
            .map(|rule| (rule.name.as_str(), rule.adjustment))
            .collect();
        assert_eq!(
            rules,
            vec![("active_job_search", 20.0), ("significantly_underpaid", 25.0)]
        );

        let mut unknown =
            definition("mystery-signals", json!([{ "calculator": "tenure", "weight": 1 }]));
        unknown.presets.push("gut_feeling".to_string());
        assert!(matches!(
            registry.register(unknown),
            Err(ConfigurationError::InvalidRule { .. })
        ));
    }

    #[test]
    fn register_rejects_malformed_rules_and_modifiers() {
        let mut registry = AlgorithmRegistry::with_builtins();

        let mut with_rule = definition("ruled", json!([{ "calculator": "tenure", "weight": 1 }]));
        with_rule.rules.push(CustomRule {
            name: "too_long".to_string(),
            condition: Condition::new("tenureMonths", ConditionOperator::Gt, json!("ages")),
            adjustment: json!(5),
        });
        assert!(matches!(
            registry.register(with_rule),
            Err(ConfigurationError::InvalidRule { .. })
        ));

        let mut with_modifier =
            definition("modded", json!([{ "calculator": "tenure", "weight": 1 }]));
        with_modifier.modifiers.push("double_everything".to_string());
        assert!(matches!(
            registry.register(with_modifier),
            Err(ConfigurationError::InvalidModifier { .. })
        ));

        assert_eq!(registry.len(), 5);
    }
}
