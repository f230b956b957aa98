//! In-memory record store implementation.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use genrepo_core::filter::Filter;
use genrepo_core::record::{Record, Value};
use genrepo_core::storage::{
    check_condition, KeyQuery, KeySchema, Page, RecordStore, RepositoryError, Result,
    WriteRequest, MAX_BATCH_WRITE,
};

const DEFAULT_PAGE_SIZE: usize = 100;

/// One key attribute as stored. Numbers use their canonical spelling, so
/// `25` and `25.0` address the same item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    String(String),
    Number(String),
    Binary(Vec<u8>),
}

impl KeyPart {
    fn from_value(name: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => Ok(Self::Number(n.canonical())),
            Value::Binary(b) => Ok(Self::Binary(b.clone())),
            other => Err(RepositoryError::InvalidKey(format!(
                "key attribute '{name}' must be S, N or B, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Primary key as stored, one part per key attribute in schema order.
type StorageKey = Vec<KeyPart>;

/// In-memory storage backend for testing.
///
/// Items are ordered by their primary key, so scans and queries return them
/// in a stable order. Data is not persisted and will be
/// lost when the last clone of the store is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    schema: KeySchema,
    page_size: usize,
    items: Arc<RwLock<BTreeMap<StorageKey, Record>>>,
}

impl InMemoryStore {
    /// Creates a new empty store for tables keyed by `schema`.
    pub fn new(schema: KeySchema) -> Self {
        Self {
            schema,
            page_size: DEFAULT_PAGE_SIZE,
            items: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Sets the maximum number of items returned per query or scan page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    fn storage_key(&self, key: &Record) -> Result<StorageKey> {
        let key = self.schema.composite_key(key)?;
        self.schema
            .attributes()
            .filter_map(|name| key.get(name).map(|value| (name, value)))
            .map(|(name, value)| KeyPart::from_value(name, value))
            .collect()
    }

    fn storage_key_of(&self, item: &Record) -> Result<StorageKey> {
        self.storage_key(&self.schema.key_of(item)?)
    }

    /// Collects one page of matching items, in key order, after `start`.
    fn page(
        &self,
        items: &BTreeMap<StorageKey, Record>,
        start: Option<Record>,
        mut predicate: impl FnMut(&Record) -> bool,
    ) -> Result<Page> {
        let lower = match start {
            Some(start) => Bound::Excluded(self.storage_key(&start)?),
            None => Bound::Unbounded,
        };

        let mut candidates = items
            .range((lower, Bound::Unbounded))
            .map(|(_, item)| item)
            .filter(|item| predicate(item));

        let page: Vec<&Record> = candidates.by_ref().take(self.page_size).collect();
        let last_evaluated_key = match (candidates.next(), page.last()) {
            (Some(_), Some(last)) => Some(self.schema.key_of(last)?),
            _ => None,
        };

        Ok(Page {
            items: page.into_iter().cloned().collect(),
            last_evaluated_key,
        })
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get_item(&self, key: &Record) -> Result<Option<Record>> {
        let storage_key = self.storage_key(key)?;
        let items = self.items.read().await;
        Ok(items.get(&storage_key).cloned())
    }

    async fn put_item(&self, item: Record) -> Result<()> {
        let storage_key = self.storage_key_of(&item)?;
        let mut items = self.items.write().await;
        items.insert(storage_key, item);
        Ok(())
    }

    async fn delete_item(&self, key: &Record) -> Result<()> {
        let storage_key = self.storage_key(key)?;
        let mut items = self.items.write().await;
        items.remove(&storage_key);
        Ok(())
    }

    async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<()> {
        if requests.len() > MAX_BATCH_WRITE {
            return Err(RepositoryError::InvalidData(format!(
                "batch of {} requests exceeds the limit of {}",
                requests.len(),
                MAX_BATCH_WRITE
            )));
        }

        // Resolve every key before touching the map so a bad request writes nothing.
        let resolved = requests
            .into_iter()
            .map(|request| match request {
                WriteRequest::Put(item) => Ok((self.storage_key_of(&item)?, Some(item))),
                WriteRequest::Delete(key) => Ok((self.storage_key(&key)?, None)),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut items = self.items.write().await;
        for (storage_key, item) in resolved {
            match item {
                Some(item) => {
                    items.insert(storage_key, item);
                }
                None => {
                    items.remove(&storage_key);
                }
            }
        }
        Ok(())
    }

    async fn query_page(&self, query: &KeyQuery, start: Option<Record>) -> Result<Page> {
        let items = self.items.read().await;
        self.page(&items, start, |item| {
            item.get(&query.key_name) == Some(&query.key_value)
        })
    }

    async fn scan_page(&self, start: Option<Record>) -> Result<Page> {
        let items = self.items.read().await;
        self.page(&items, start, |_| true)
    }

    async fn update_item(
        &self,
        key: &Record,
        updates: Record,
        condition: Option<&Filter>,
    ) -> Result<Record> {
        let key = self.schema.composite_key(key)?;
        let storage_key = self.storage_key(&key)?;

        let mut items = self.items.write().await;
        let current = items.get(&storage_key).cloned();

        if let Some(condition) = condition {
            check_condition(current.as_ref(), condition)?;
        }

        let mut updated = current.unwrap_or_else(|| key.clone());
        updated.extend(updates);
        updated.extend(key);
        items.insert(storage_key, updated.clone());
        Ok(updated)
    }

    async fn item_count(&self) -> Result<u64> {
        let items = self.items.read().await;
        Ok(items.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genrepo_core::record;
    use genrepo_core::record::Number;
    use serde_json::json;

    fn store() -> InMemoryStore {
        InMemoryStore::new(KeySchema::new("id"))
    }

    fn composite_store() -> InMemoryStore {
        InMemoryStore::new(KeySchema::new("pk").with_sort_key("sk"))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = store();
        let item = record! { "id" => "a", "name" => "Alice" };

        store.put_item(item.clone()).await.unwrap();

        let retrieved = store.get_item(&record! { "id" => "a" }).await.unwrap();
        assert_eq!(retrieved, Some(item));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let result = store().get_item(&record! { "id" => "missing" }).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_without_key_fails() {
        let result = store().put_item(record! { "name" => "no key" }).await;
        assert!(matches!(result, Err(RepositoryError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let store = store();
        store.put_item(record! { "id" => "a", "v" => 1 }).await.unwrap();
        store.put_item(record! { "id" => "a", "w" => 2 }).await.unwrap();

        let item = store.get_item(&record! { "id" => "a" }).await.unwrap().unwrap();
        assert_eq!(item, record! { "id" => "a", "w" => 2 });
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store();
        store.put_item(record! { "id" => "a" }).await.unwrap();

        store.delete_item(&record! { "id" => "a" }).await.unwrap();
        store.delete_item(&record! { "id" => "a" }).await.unwrap();

        assert_eq!(store.item_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_composite_keys_are_distinct() {
        let store = composite_store();
        store.put_item(record! { "pk" => "u1", "sk" => "o1" }).await.unwrap();
        store.put_item(record! { "pk" => "u1", "sk" => "o2" }).await.unwrap();

        assert_eq!(store.item_count().await.unwrap(), 2);
        let missing = store
            .get_item(&record! { "pk" => "u1", "sk" => "o3" })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_numeric_keys_match_by_value() {
        let store = store();
        store
            .put_item(record! { "id" => Value::Number(Number::parse("25").unwrap()), "v" => 1 })
            .await
            .unwrap();

        let key = record! { "id" => Value::Number(Number::parse("25.0").unwrap()) };
        let item = store.get_item(&key).await.unwrap().unwrap();
        assert_eq!(item["v"], Value::from(1));

        store
            .put_item(record! { "id" => Value::Number(Number::parse("2.5e1").unwrap()), "v" => 2 })
            .await
            .unwrap();
        assert_eq!(store.item_count().await.unwrap(), 1);

        store.delete_item(&record! { "id" => 25 }).await.unwrap();
        assert_eq!(store.item_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_composite_key_parts_do_not_collide() {
        let store = composite_store();
        store
            .put_item(record! { "pk" => "a\u{1f}S:b", "sk" => "c", "n" => 1 })
            .await
            .unwrap();
        store
            .put_item(record! { "pk" => "a", "sk" => "b\u{1f}S:c", "n" => 2 })
            .await
            .unwrap();

        assert_eq!(store.item_count().await.unwrap(), 2);
        let first = store
            .get_item(&record! { "pk" => "a\u{1f}S:b", "sk" => "c" })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first["n"], Value::from(1));
    }

    #[tokio::test]
    async fn test_string_and_number_keys_are_distinct() {
        let store = store();
        store.put_item(record! { "id" => "1" }).await.unwrap();
        store.put_item(record! { "id" => 1 }).await.unwrap();
        assert_eq!(store.item_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_batch_applies_puts_and_deletes() {
        let store = store();
        store.put_item(record! { "id" => "old" }).await.unwrap();

        store
            .write_batch(vec![
                WriteRequest::Put(record! { "id" => "a" }),
                WriteRequest::Put(record! { "id" => "b" }),
                WriteRequest::Delete(record! { "id" => "old" }),
            ])
            .await
            .unwrap();

        assert_eq!(store.item_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_batch_rejects_oversized_batches() {
        let requests = (0..=MAX_BATCH_WRITE)
            .map(|i| WriteRequest::Put(record! { "id" => i }))
            .collect();

        let result = store().write_batch(requests).await;
        assert!(matches!(result, Err(RepositoryError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_write_batch_with_bad_key_writes_nothing() {
        let store = store();
        let result = store
            .write_batch(vec![
                WriteRequest::Put(record! { "id" => "a" }),
                WriteRequest::Put(record! { "name" => "no key" }),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.item_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_pages() {
        let store = store().with_page_size(2);
        for id in ["a", "b", "c", "d", "e"] {
            store.put_item(record! { "id" => id }).await.unwrap();
        }

        let first = store.scan_page(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.last_evaluated_key, Some(record! { "id" => "b" }));

        let second = store.scan_page(first.last_evaluated_key).await.unwrap();
        assert_eq!(second.items[0], record! { "id" => "c" });

        let third = store.scan_page(second.last_evaluated_key).await.unwrap();
        assert_eq!(third.items, vec![record! { "id" => "e" }]);
        assert!(third.is_last());
    }

    #[tokio::test]
    async fn test_exact_final_page_has_no_continuation() {
        let store = store().with_page_size(2);
        store.put_item(record! { "id" => "a" }).await.unwrap();
        store.put_item(record! { "id" => "b" }).await.unwrap();

        let page = store.scan_page(None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_query_by_partition_key() {
        let store = composite_store().with_page_size(1);
        store.put_item(record! { "pk" => "u1", "sk" => "o1" }).await.unwrap();
        store.put_item(record! { "pk" => "u2", "sk" => "o1" }).await.unwrap();
        store.put_item(record! { "pk" => "u1", "sk" => "o2" }).await.unwrap();

        let query = KeyQuery::table("pk", "u1");
        let first = store.query_page(&query, None).await.unwrap();
        assert_eq!(first.items, vec![record! { "pk" => "u1", "sk" => "o1" }]);

        let second = store
            .query_page(&query, first.last_evaluated_key)
            .await
            .unwrap();
        assert_eq!(second.items, vec![record! { "pk" => "u1", "sk" => "o2" }]);
        assert!(second.is_last());
    }

    #[tokio::test]
    async fn test_query_on_secondary_attribute() {
        let store = store();
        store
            .put_item(record! { "id" => "a", "email" => "a@example.com" })
            .await
            .unwrap();
        store.put_item(record! { "id" => "b" }).await.unwrap();

        let query = KeyQuery::index("email-index", "email", "a@example.com");
        let page = store.query_page(&query, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["id"], Value::from("a"));
    }

    #[tokio::test]
    async fn test_update_sets_attributes_and_returns_item() {
        let store = store();
        store
            .put_item(record! { "id" => "a", "status" => "active", "value" => 10 })
            .await
            .unwrap();

        let updated = store
            .update_item(&record! { "id" => "a" }, record! { "value" => 20 }, None)
            .await
            .unwrap();

        assert_eq!(updated, record! { "id" => "a", "status" => "active", "value" => 20 });
    }

    #[tokio::test]
    async fn test_update_creates_missing_item_without_condition() {
        let store = store();
        let updated = store
            .update_item(&record! { "id" => "new" }, record! { "value" => 1 }, None)
            .await
            .unwrap();

        assert_eq!(updated, record! { "id" => "new", "value" => 1 });
        assert_eq!(store.item_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_condition_failure_leaves_item_unchanged() {
        let store = store();
        store
            .put_item(record! { "id" => "a", "status" => "inactive", "value" => 10 })
            .await
            .unwrap();
        let condition = Filter::parse(&json!({"status": "active"})).unwrap();

        let result = store
            .update_item(
                &record! { "id" => "a" },
                record! { "value" => 20 },
                Some(&condition),
            )
            .await;

        assert!(matches!(result, Err(RepositoryError::ConditionFailed(_))));
        let item = store.get_item(&record! { "id" => "a" }).await.unwrap().unwrap();
        assert_eq!(item["value"], Value::from(10));
    }

    #[tokio::test]
    async fn test_conditional_update_of_missing_item_fails() {
        let condition = Filter::parse(&json!({"status": "active"})).unwrap();
        let result = store()
            .update_item(
                &record! { "id" => "ghost" },
                record! { "value" => 1 },
                Some(&condition),
            )
            .await;

        assert!(matches!(result, Err(RepositoryError::ConditionFailed(_))));
    }

    #[tokio::test]
    async fn test_update_cannot_change_key() {
        let store = store();
        let updated = store
            .update_item(
                &record! { "id" => "a" },
                record! { "id" => "b", "v" => 1 },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated["id"], Value::from("a"));
    }
}
