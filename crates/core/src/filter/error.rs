use thiserror::Error;

/// Attribute label used when the filter as a whole is malformed.
pub const WHOLE_FILTER: &str = "(filter)";

/// A malformed filter clause, raised during normalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid filter on '{attribute}': {reason}")]
pub struct InvalidFilterError {
    pub attribute: String,
    pub reason: InvalidFilterReason,
}

impl InvalidFilterError {
    pub fn new(attribute: impl Into<String>, reason: InvalidFilterReason) -> Self {
        Self {
            attribute: attribute.into(),
            reason,
        }
    }
}

/// Why a clause was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidFilterReason {
    #[error("filter must be an object of attribute clauses")]
    NotAnObject,
    #[error("unsupported operator: {0}")]
    UnknownOperator(String),
    #[error("no operator given")]
    NoOperator,
    #[error("more than one operator given: {0}")]
    MultipleOperators(String),
    #[error("operator '{operator}' cannot be combined with other keys: {keys}")]
    MixedKeys { operator: String, keys: String },
    #[error("'between' operator requires a list of two values")]
    BetweenArity,
    #[error("'in' operator requires a list of values")]
    InRequiresList,
    #[error("operator '{0}' requires a value")]
    MissingValue(String),
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("value cannot be represented as type {0}")]
    Coercion(String),
}
