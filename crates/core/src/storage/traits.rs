use async_trait::async_trait;

use crate::filter::Filter;
use crate::record::Record;

use super::{KeyQuery, Page, Result, WriteRequest};

/// Largest number of requests a single `write_batch` call accepts.
pub const MAX_BATCH_WRITE: usize = 25;

/// Item-level access to a single key-value table.
///
/// Keys passed in are complete primary keys (see [`super::KeySchema`]).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Gets an item by its primary key.
    async fn get_item(&self, key: &Record) -> Result<Option<Record>>;

    /// Writes an item, replacing any existing item with the same key.
    async fn put_item(&self, item: Record) -> Result<()>;

    /// Deletes an item. Deleting a missing item is not an error.
    async fn delete_item(&self, key: &Record) -> Result<()>;

    /// Applies up to [`MAX_BATCH_WRITE`] puts and deletes.
    async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<()>;

    /// Fetches one page of items whose `key_name` equals `key_value`.
    async fn query_page(&self, query: &KeyQuery, start: Option<Record>) -> Result<Page>;

    /// Fetches one page of the whole table.
    async fn scan_page(&self, start: Option<Record>) -> Result<Page>;

    /// Sets `updates` on the item at `key` and returns the updated item.
    ///
    /// When `condition` is given it is evaluated against the current item (or
    /// an empty item when none exists); if it does not hold, nothing is
    /// written and `RepositoryError::ConditionFailed` is returned.
    async fn update_item(
        &self,
        key: &Record,
        updates: Record,
        condition: Option<&Filter>,
    ) -> Result<Record>;

    /// Approximate number of items in the table.
    async fn item_count(&self) -> Result<u64>;
}
