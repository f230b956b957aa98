use thiserror::Error;

use crate::filter::InvalidFilterError;

/// Message used when a conditional write is rejected without a caller-supplied reason.
pub const DEFAULT_REJECTION_MESSAGE: &str = "The conditional request failed";

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Key not found in table {table}: {key}")]
    NotFound { table: String, key: String },
    #[error("Condition check failed: {0}")]
    ConditionFailed(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),
}

impl RepositoryError {
    /// True for a rejected conditional write.
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, RepositoryError::ConditionFailed(_))
    }

    /// Store-style error code, as reported back to callers of conditional updates.
    pub fn code(&self) -> &'static str {
        match self {
            RepositoryError::NotFound { .. } => "ResourceNotFound",
            RepositoryError::ConditionFailed(_) => "ConditionalCheckFailedException",
            RepositoryError::ConnectionFailed(_) => "ConnectionFailed",
            RepositoryError::QueryFailed(_) => "QueryFailed",
            RepositoryError::Serialization(_) => "SerializationError",
            RepositoryError::InvalidData(_) => "InvalidData",
            RepositoryError::InvalidKey(_) => "ValidationException",
            RepositoryError::InvalidFilter(_) => "ValidationException",
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::InvalidFilterReason;

    #[test]
    fn test_repository_error_not_found_display() {
        let error = RepositoryError::NotFound {
            table: "users".to_string(),
            key: "id=abc-123".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Key not found in table users: id=abc-123"
        );
    }

    #[test]
    fn test_repository_error_condition_failed_display() {
        let error = RepositoryError::ConditionFailed("Item must be active".to_string());
        assert_eq!(error.to_string(), "Condition check failed: Item must be active");
        assert!(error.is_condition_failed());
        assert_eq!(error.code(), "ConditionalCheckFailedException");
    }

    #[test]
    fn test_repository_error_connection_failed_display() {
        let error = RepositoryError::ConnectionFailed("timeout after 30s".to_string());
        assert_eq!(error.to_string(), "Connection failed: timeout after 30s");
    }

    #[test]
    fn test_repository_error_query_failed_display() {
        let error = RepositoryError::QueryFailed("invalid partition key".to_string());
        assert_eq!(error.to_string(), "Query failed: invalid partition key");
    }

    #[test]
    fn test_repository_error_serialization_display() {
        let error = RepositoryError::Serialization("unsupported attribute type".to_string());
        assert_eq!(
            error.to_string(),
            "Serialization error: unsupported attribute type"
        );
    }

    #[test]
    fn test_repository_error_invalid_key_display() {
        let error = RepositoryError::InvalidKey("missing sort key 'sk'".to_string());
        assert_eq!(error.to_string(), "Invalid key: missing sort key 'sk'");
    }

    #[test]
    fn test_invalid_filter_is_transparent() {
        let error: RepositoryError =
            InvalidFilterError::new("score", InvalidFilterReason::BetweenArity).into();
        assert_eq!(
            error.to_string(),
            "Invalid filter on 'score': 'between' operator requires a list of two values"
        );
        assert!(!error.is_condition_failed());
    }
}
