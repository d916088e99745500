//! Attrition risk scoring: calculators, aggregation, classification and the algorithm registry.

mod aggregation;
mod analytics;
mod assessment;
mod batch;
mod calculators;
mod classifier;
mod comparison;
mod conditions;
mod config;
mod domain;
mod engine;
mod error;
mod insights;
mod registry;

#[cfg(test)]
mod tests;

pub use analytics::{
    CriticalEmployee, DepartmentRollup, FactorPattern, Hotspot, OrganizationRiskReport, ScoreBucket,
};
pub use assessment::{
    AdjustmentKind, AppliedAdjustment, Insight, InsightLevel, RiskAssessment, TrendAnalysis,
    TrendDirection,
};
pub use batch::{BatchOutcome, BatchSummary};
pub use calculators::Dimension;
pub use classifier::{RiskLevel, UnknownRiskLevel};
pub use comparison::{AlgorithmComparison, AlgorithmResult, ComparisonMeta};
pub use conditions::{Condition, ConditionOperator};
pub use config::{
    Band, CalculatorTables, CompensationTable, EngagementTable, MarketTable, ObsolescenceTable,
    PerformanceTable, ScoringConfig, SelectionPolicy, Step, TenureTable,
};
pub use domain::{Employee, EmployeeId, RiskFactors, SkillRarity};
pub use engine::RiskEngine;
pub use error::{ConfigurationError, ScoringError, ValidationError};
pub use registry::{
    AlgorithmConfig, AlgorithmFeatures, AlgorithmRegistry, AlgorithmSummary,
    CustomAlgorithmDefinition, CustomFactor, CustomRule, Modifier, Rule, RulePreset,
    WeightedFactor, AUTO_ALGORITHM,
};
