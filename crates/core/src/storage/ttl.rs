use chrono::{DateTime, Duration, Utc};

use super::error::{RepositoryError, Result};

/// Attribute holding the expiration time, in epoch seconds.
pub const EXPIRE_AT_ATTRIBUTE: &str = "_expireAt";

/// Epoch seconds `days` after `now`.
///
/// Fails with `InvalidData` when the expiration falls outside the
/// representable date range.
pub fn expire_at_epoch(now: DateTime<Utc>, days: u32) -> Result<i64> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .map(|expire_at| expire_at.timestamp())
        .ok_or_else(|| {
            RepositoryError::InvalidData(format!(
                "expiration of {days} days is out of range"
            ))
        })
}
