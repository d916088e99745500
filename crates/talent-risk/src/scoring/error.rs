use super::domain::EmployeeId;

/// Error raised by the scoring engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("algorithm '{name}' is not registered")]
    AlgorithmNotFound { name: String },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("scoring failed for employee {employee_id}: {reason}")]
    Calculation {
        employee_id: EmployeeId,
        reason: String,
    },
}

/// Input rejected before any calculator runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("employee record is missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("field '{field}' has value {value}, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("employee record could not be parsed: {reason}")]
    Malformed { reason: String },
}

/// Algorithm definition or engine table rejected at registration time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("algorithm name must not be blank")]
    BlankName,
    #[error("algorithm name '{0}' is reserved")]
    ReservedName(String),
    #[error("algorithm '{0}' is already registered")]
    DuplicateName(String),
    #[error("algorithm '{0}' must declare at least one weighted factor")]
    NoFactors(String),
    #[error("unknown calculator '{0}'")]
    UnknownCalculator(String),
    #[error("calculator '{0}' is weighted more than once")]
    DuplicateCalculator(String),
    #[error("weight for '{calculator}' must be a non-negative finite number, got {value}")]
    InvalidWeight { calculator: String, value: String },
    #[error("weights of algorithm '{0}' sum to zero")]
    ZeroTotalWeight(String),
    #[error("weights of algorithm '{0}' do not sum to a finite number")]
    UnboundedTotalWeight(String),
    #[error("rule '{rule}' is malformed: {reason}")]
    InvalidRule { rule: String, reason: String },
    #[error("modifier '{modifier}' is malformed: {reason}")]
    InvalidModifier { modifier: String, reason: String },
    #[error("scoring table '{table}' is malformed: {reason}")]
    InvalidTable { table: &'static str, reason: String },
}
