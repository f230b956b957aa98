//! Conditional write checks shared by every backend.

use crate::filter::{matches, Filter};
use crate::record::Record;

use super::error::{RepositoryError, Result, DEFAULT_REJECTION_MESSAGE};

/// Checks an update condition against the item as currently stored.
///
/// A missing item is checked as an empty one, so only `ne` and `not_exists`
/// clauses can pass for it.
pub fn check_condition(current: Option<&Record>, condition: &Filter) -> Result<()> {
    let empty = Record::new();
    if matches(current.unwrap_or(&empty), condition) {
        Ok(())
    } else {
        Err(RepositoryError::ConditionFailed(
            DEFAULT_REJECTION_MESSAGE.to_string(),
        ))
    }
}
