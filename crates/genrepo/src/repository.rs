//! Generic repository facade over a [`RecordStore`].
//!
//! Adds the table-level conventions on top of raw item access: primary key
//! merging, item expiration, debug mode, batch chunking, pagination and
//! client-side filtering of query and scan results.

use chrono::Utc;
use futures_util::stream::Stream;

use genrepo_core::filter::{apply, apply_stream, Filter};
use genrepo_core::record::{Record, Value};
use genrepo_core::storage::{
    expire_at_epoch, KeyQuery, KeySchema, RecordStore, RepositoryError, Result, WriteRequest,
    DEFAULT_REJECTION_MESSAGE, EXPIRE_AT_ATTRIBUTE, MAX_BATCH_WRITE,
};

use crate::config::RepositoryConfig;

/// Options for single-item saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Return the stored item after writing.
    pub return_model: bool,
    /// Stamp `_expireAt` when the repository has an expiration configured.
    pub set_expiration: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            return_model: true,
            set_expiration: true,
        }
    }
}

/// Table-scoped repository.
///
/// Every write is skipped in debug mode; reads always reach the store.
#[derive(Debug, Clone)]
pub struct GenericRepository<S> {
    store: S,
    table_name: String,
    schema: KeySchema,
    data_expiration_days: Option<u32>,
    debug_mode: bool,
}

impl<S: RecordStore> GenericRepository<S> {
    pub fn new(store: S, table_name: impl Into<String>, schema: KeySchema) -> Self {
        Self {
            store,
            table_name: table_name.into(),
            schema,
            data_expiration_days: None,
            debug_mode: false,
        }
    }

    pub fn from_config(store: S, config: &RepositoryConfig) -> Self {
        Self::new(store, &config.table_name, config.key_schema())
            .with_expiration_days(config.data_expiration_days)
            .with_debug_mode(config.debug_mode)
    }

    pub fn with_expiration_days(mut self, days: Option<u32>) -> Self {
        self.data_expiration_days = days;
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn stamp_expiration(&self, item: &mut Record, set_expiration: bool) -> Result<()> {
        if let (true, Some(days)) = (set_expiration, self.data_expiration_days) {
            item.insert(
                EXPIRE_AT_ATTRIBUTE.to_string(),
                Value::from(expire_at_epoch(Utc::now(), days)?),
            );
        }
        Ok(())
    }

    // ===========================
    // Reads
    // ===========================

    /// Loads an item by partition key value.
    pub async fn load(&self, primary_key_value: impl Into<Value>) -> Result<Option<Record>> {
        let key = self.schema.simple_key(primary_key_value)?;
        self.load_by_composite_key(&key).await
    }

    /// Loads an item by its full primary key.
    pub async fn load_by_composite_key(&self, key: &Record) -> Result<Option<Record>> {
        let key = self.schema.composite_key(key)?;
        self.store.get_item(&key).await.inspect_err(|e| {
            tracing::error!(table = %self.table_name, error = %e, "Error loading item");
        })
    }

    /// Like [`GenericRepository::load`], failing with `NotFound` when absent.
    pub async fn load_or_throw(&self, primary_key_value: impl Into<Value>) -> Result<Record> {
        let key = self.schema.simple_key(primary_key_value)?;
        self.load_by_composite_key(&key)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                table: self.table_name.clone(),
                key: self.schema.describe(&key),
            })
    }

    // ===========================
    // Single-item writes
    // ===========================

    /// Saves `model` under `primary_key_value`.
    ///
    /// The key attribute is set on the item, overriding any value in the
    /// model. Returns the stored item when `return_model` is set; always
    /// `None` in debug mode.
    pub async fn save(
        &self,
        primary_key_value: impl Into<Value>,
        model: Record,
        options: SaveOptions,
    ) -> Result<Option<Record>> {
        let key = self.schema.simple_key(primary_key_value)?;
        if self.debug_mode {
            tracing::info!(
                table = %self.table_name,
                key = %self.schema.describe(&key),
                "Debug mode: skipping save"
            );
            return Ok(None);
        }

        let mut item = self.schema.merge_key(&model, &key);
        self.stamp_expiration(&mut item, options.set_expiration)?;
        let item_key = self.schema.key_of(&item)?;

        self.store.put_item(item).await.inspect_err(|e| {
            tracing::error!(table = %self.table_name, error = %e, "Error saving item");
        })?;

        if options.return_model {
            self.store.get_item(&item_key).await
        } else {
            Ok(None)
        }
    }

    /// Saves an item that already carries its full primary key.
    ///
    /// Returns the item as written when `return_model` is set.
    pub async fn save_with_composite_key(
        &self,
        item_data: Record,
        options: SaveOptions,
    ) -> Result<Option<Record>> {
        if self.debug_mode {
            tracing::info!(table = %self.table_name, "Debug mode: skipping composite key save");
            return Ok(None);
        }

        let mut item = item_data;
        self.stamp_expiration(&mut item, options.set_expiration)?;
        self.schema.key_of(&item)?;

        let written = options.return_model.then(|| item.clone());
        self.store.put_item(item).await.inspect_err(|e| {
            tracing::error!(
                table = %self.table_name,
                error = %e,
                "Error saving item with composite key"
            );
        })?;
        Ok(written)
    }

    /// Deletes an item by partition key value.
    pub async fn delete(&self, primary_key_value: impl Into<Value>) -> Result<()> {
        let key = self.schema.simple_key(primary_key_value)?;
        self.delete_by_composite_key(&key).await
    }

    /// Deletes an item by its full primary key. Missing items are ignored.
    pub async fn delete_by_composite_key(&self, key: &Record) -> Result<()> {
        let key = self.schema.composite_key(key)?;
        if self.debug_mode {
            tracing::info!(
                table = %self.table_name,
                key = %self.schema.describe(&key),
                "Debug mode: skipping delete"
            );
            return Ok(());
        }

        self.store.delete_item(&key).await.inspect_err(|e| {
            tracing::error!(table = %self.table_name, error = %e, "Error deleting item");
        })
    }

    // ===========================
    // Conditional updates
    // ===========================

    /// Sets `update_data` on the item at `primary_key_value`.
    ///
    /// See [`GenericRepository::update_by_composite_key`].
    pub async fn update(
        &self,
        primary_key_value: impl Into<Value>,
        update_data: Record,
        conditions: Option<&Filter>,
        rejection_message: Option<&str>,
    ) -> Result<Option<Record>> {
        let key = self.schema.simple_key(primary_key_value)?;
        self.update_by_composite_key(&key, update_data, conditions, rejection_message)
            .await
    }

    /// Sets `update_data` on the item at `key` and returns the updated item.
    ///
    /// `conditions` use the filter language and are checked against the
    /// current item atomically with the write; a missing item only satisfies
    /// conditions that hold for an empty item. `None` or an empty filter
    /// updates unconditionally, creating the item if needed. A rejected
    /// condition yields `ConditionFailed` carrying `rejection_message`.
    ///
    /// Key attributes may be repeated in `update_data` with their current
    /// value but cannot be changed. Returns `None` in debug mode.
    pub async fn update_by_composite_key(
        &self,
        key: &Record,
        update_data: Record,
        conditions: Option<&Filter>,
        rejection_message: Option<&str>,
    ) -> Result<Option<Record>> {
        let key = self.schema.composite_key(key)?;
        let mut updates = update_data;
        for name in self.schema.attributes() {
            match (updates.remove(name), key.get(name)) {
                (Some(new), Some(current)) if &new != current => {
                    return Err(RepositoryError::InvalidKey(format!(
                        "cannot change key attribute '{name}'"
                    )));
                }
                _ => {}
            }
        }
        if updates.is_empty() {
            return Err(RepositoryError::InvalidData(
                "No attributes to update".to_string(),
            ));
        }

        if self.debug_mode {
            tracing::info!(
                table = %self.table_name,
                key = %self.schema.describe(&key),
                "Debug mode: skipping update"
            );
            return Ok(None);
        }

        let condition = conditions.filter(|c| !c.is_empty());
        match self.store.update_item(&key, updates, condition).await {
            Ok(item) => Ok(Some(item)),
            Err(RepositoryError::ConditionFailed(_)) => {
                let message = rejection_message.unwrap_or(DEFAULT_REJECTION_MESSAGE);
                tracing::warn!(
                    table = %self.table_name,
                    key = %self.schema.describe(&key),
                    reason = message,
                    "Conditional update rejected"
                );
                Err(RepositoryError::ConditionFailed(message.to_string()))
            }
            Err(e) => {
                tracing::error!(table = %self.table_name, error = %e, "Error updating item");
                Err(e)
            }
        }
    }

    // ===========================
    // Batch writes
    // ===========================

    /// Saves items in chunks of 25. Each model must carry its full key.
    ///
    /// Every model is validated before the first chunk is written.
    pub async fn save_batch(&self, models: Vec<Record>, set_expiration: bool) -> Result<()> {
        if self.debug_mode {
            tracing::info!(
                table = %self.table_name,
                count = models.len(),
                "Debug mode: skipping batch save"
            );
            return Ok(());
        }

        let requests = models
            .into_iter()
            .map(|mut item| -> Result<WriteRequest> {
                self.stamp_expiration(&mut item, set_expiration)?;
                self.schema.key_of(&item)?;
                Ok(WriteRequest::Put(item))
            })
            .collect::<Result<Vec<_>>>()?;

        self.write_chunked(requests, "batch save").await
    }

    /// Deletes items by key in chunks of 25.
    pub async fn delete_batch_by_keys(&self, keys: Vec<Record>) -> Result<()> {
        if self.debug_mode {
            tracing::info!(
                table = %self.table_name,
                count = keys.len(),
                "Debug mode: skipping batch delete"
            );
            return Ok(());
        }

        let requests = keys
            .iter()
            .map(|key| -> Result<WriteRequest> {
                Ok(WriteRequest::Delete(self.schema.composite_key(key)?))
            })
            .collect::<Result<Vec<_>>>()?;

        self.write_chunked(requests, "batch delete").await
    }

    /// Deletes every item in a partition and returns how many were removed.
    pub async fn delete_all_by_primary_key(
        &self,
        primary_key_value: impl Into<Value>,
    ) -> Result<usize> {
        let primary_key_value = primary_key_value.into();
        if self.debug_mode {
            tracing::info!(
                table = %self.table_name,
                partition = %primary_key_value,
                "Debug mode: skipping partition delete"
            );
            return Ok(0);
        }
        if primary_key_value.is_empty_key() {
            return Ok(0);
        }

        let query = KeyQuery::table(&self.schema.partition_key, primary_key_value);
        let keys = self
            .query_all(&query, &Filter::new())
            .await?
            .iter()
            .map(|item| self.schema.key_of(item))
            .collect::<Result<Vec<_>>>()?;
        let count = keys.len();

        self.delete_batch_by_keys(keys).await?;
        Ok(count)
    }

    async fn write_chunked(&self, requests: Vec<WriteRequest>, operation: &str) -> Result<()> {
        let mut requests = requests.into_iter().peekable();
        while requests.peek().is_some() {
            let chunk: Vec<_> = requests.by_ref().take(MAX_BATCH_WRITE).collect();
            tracing::debug!(table = %self.table_name, size = chunk.len(), "Writing {}", operation);
            self.store.write_batch(chunk).await.inspect_err(|e| {
                tracing::error!(table = %self.table_name, error = %e, "Error in {}", operation);
            })?;
        }
        Ok(())
    }

    // ===========================
    // Queries
    // ===========================

    /// Every item in the partition `primary_key_value` that matches `filter`.
    ///
    /// An empty or null partition value yields no items without a query.
    pub async fn find_all(
        &self,
        primary_key_value: impl Into<Value>,
        filter: &Filter,
    ) -> Result<Vec<Record>> {
        let primary_key_value = primary_key_value.into();
        if primary_key_value.is_empty_key() {
            return Ok(Vec::new());
        }
        let query = KeyQuery::table(&self.schema.partition_key, primary_key_value);
        self.query_all(&query, filter).await
    }

    /// Every item whose `key_name` equals `key_value` in `index_name`,
    /// filtered by `filter`.
    pub async fn find_all_with_index(
        &self,
        index_name: &str,
        key_name: &str,
        key_value: impl Into<Value>,
        filter: &Filter,
    ) -> Result<Vec<Record>> {
        let query = KeyQuery::index(index_name, key_name, key_value);
        self.query_all(&query, filter).await
    }

    /// First result of [`GenericRepository::find_all_with_index`].
    pub async fn find_one_with_index(
        &self,
        index_name: &str,
        key_name: &str,
        key_value: impl Into<Value>,
        filter: &Filter,
    ) -> Result<Option<Record>> {
        let items = self
            .find_all_with_index(index_name, key_name, key_value, filter)
            .await?;
        Ok(items.into_iter().next())
    }

    async fn query_all(&self, query: &KeyQuery, filter: &Filter) -> Result<Vec<Record>> {
        let mut items = Vec::new();
        let mut start = None;
        loop {
            let page = self
                .store
                .query_page(query, start.take())
                .await
                .inspect_err(|e| {
                    tracing::error!(table = %self.table_name, error = %e, "Error in query");
                })?;
            tracing::debug!(
                table = %self.table_name,
                index = query.index_name.as_deref().unwrap_or("(table)"),
                fetched = page.items.len(),
                "Fetched query page"
            );
            items.extend(apply(page.items, filter));
            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        Ok(items)
    }

    /// Streams every item in the table that matches `filter`.
    ///
    /// Pages are fetched on demand as the stream is polled; a store error is
    /// yielded once and ends the stream.
    pub fn load_all<'a>(
        &'a self,
        filter: &'a Filter,
    ) -> impl Stream<Item = Result<Record>> + 'a {
        apply_stream(self.scan_all(), filter)
    }

    fn scan_all(&self) -> impl Stream<Item = Result<Record>> + '_ {
        async_stream::stream! {
            let mut start = None;
            loop {
                match self.store.scan_page(start.take()).await {
                    Ok(page) => {
                        tracing::debug!(
                            table = %self.table_name,
                            fetched = page.items.len(),
                            "Fetched scan page"
                        );
                        for item in page.items {
                            yield Ok(item);
                        }
                        match page.last_evaluated_key {
                            Some(key) => start = Some(key),
                            None => break,
                        }
                    }
                    Err(e) => {
                        tracing::error!(table = %self.table_name, error = %e, "Error in scan");
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    /// Approximate number of items in the table, from store metadata.
    pub async fn count(&self) -> Result<u64> {
        self.store.item_count().await.inspect_err(|e| {
            tracing::error!(table = %self.table_name, error = %e, "Error counting items");
        })
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures_util::StreamExt;
    use genrepo_core::record;
    use genrepo_core::storage::Page;
    use serde_json::json;

    use super::*;
    use crate::storage::InMemoryStore;

    fn repo() -> GenericRepository<InMemoryStore> {
        let schema = KeySchema::new("id");
        GenericRepository::new(InMemoryStore::new(schema.clone()), "users", schema)
    }

    fn composite_repo() -> GenericRepository<InMemoryStore> {
        let schema = KeySchema::new("pk").with_sort_key("sk");
        GenericRepository::new(
            InMemoryStore::new(schema.clone()).with_page_size(2),
            "orders",
            schema,
        )
    }

    fn filter(json: serde_json::Value) -> Filter {
        Filter::parse(&json).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let repo = repo();
        let saved = repo
            .save("u1", record! { "name" => "Alice" }, SaveOptions::default())
            .await
            .unwrap();

        assert_eq!(saved, Some(record! { "id" => "u1", "name" => "Alice" }));
        assert_eq!(repo.load("u1").await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_key_overrides_model() {
        let repo = repo();
        repo.save("u1", record! { "id" => "other" }, SaveOptions::default())
            .await
            .unwrap();

        assert!(repo.load("other").await.unwrap().is_none());
        assert!(repo.load("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_without_return_model() {
        let options = SaveOptions {
            return_model: false,
            ..SaveOptions::default()
        };
        let result = repo().save("u1", record! {}, options).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_save_stamps_expiration() {
        let repo = repo().with_expiration_days(Some(30));
        let before = expire_at_epoch(Utc::now(), 30).unwrap();

        let saved = repo
            .save("u1", record! {}, SaveOptions::default())
            .await
            .unwrap()
            .unwrap();

        let expire_at = saved[EXPIRE_AT_ATTRIBUTE].as_number().unwrap().as_i128().unwrap();
        assert!(expire_at >= i128::from(before));
        assert!(expire_at <= i128::from(before) + 5);
    }

    #[tokio::test]
    async fn test_out_of_range_expiration_is_rejected() {
        let repo = repo().with_expiration_days(Some(200_000_000));

        let result = repo.save("u1", record! {}, SaveOptions::default()).await;
        assert!(matches!(result, Err(RepositoryError::InvalidData(_))));

        let result = repo.save_batch(vec![record! { "id" => "u2" }], true).await;
        assert!(matches!(result, Err(RepositoryError::InvalidData(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_skips_expiration_when_not_requested() {
        let repo = repo().with_expiration_days(Some(30));
        let options = SaveOptions {
            set_expiration: false,
            ..SaveOptions::default()
        };

        let saved = repo.save("u1", record! {}, options).await.unwrap().unwrap();
        assert!(!saved.contains_key(EXPIRE_AT_ATTRIBUTE));
    }

    #[tokio::test]
    async fn test_debug_mode_skips_writes() {
        let repo = repo().with_debug_mode(true);

        let saved = repo
            .save("u1", record! { "name" => "Alice" }, SaveOptions::default())
            .await
            .unwrap();
        repo.save_batch(vec![record! { "id" => "u2" }], true)
            .await
            .unwrap();
        let updated = repo
            .update("u1", record! { "name" => "Bob" }, None, None)
            .await
            .unwrap();

        assert!(saved.is_none());
        assert!(updated.is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_or_throw() {
        let repo = repo();
        let err = repo.load_or_throw("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Key not found in table users: id=missing");

        repo.save("u1", record! {}, SaveOptions::default())
            .await
            .unwrap();
        assert_eq!(repo.load_or_throw("u1").await.unwrap()["id"], Value::from("u1"));
    }

    #[tokio::test]
    async fn test_composite_key_save_load_delete() {
        let repo = composite_repo();
        let item = record! { "pk" => "tenant", "sk" => "2024-09-01", "payload" => "x" };

        let written = repo
            .save_with_composite_key(item.clone(), SaveOptions::default())
            .await
            .unwrap();
        assert_eq!(written, Some(item.clone()));

        let key = record! { "pk" => "tenant", "sk" => "2024-09-01" };
        assert_eq!(repo.load_by_composite_key(&key).await.unwrap(), Some(item));

        repo.delete_by_composite_key(&key).await.unwrap();
        assert!(repo.load_by_composite_key(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_on_composite_table_requires_sort_key() {
        let err = composite_repo().load("tenant").await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_save_batch_chunks_large_batches() {
        let store = CountingStore::new(KeySchema::new("id"));
        let repo = GenericRepository::new(store.clone(), "users", KeySchema::new("id"));
        let models = (0..60).map(|i| record! { "id" => i }).collect();

        repo.save_batch(models, true).await.unwrap();

        assert_eq!(store.batches.load(Ordering::SeqCst), 3);
        assert_eq!(repo.count().await.unwrap(), 60);
    }

    #[tokio::test]
    async fn test_save_batch_empty_is_noop() {
        let store = CountingStore::new(KeySchema::new("id"));
        let repo = GenericRepository::new(store.clone(), "users", KeySchema::new("id"));

        repo.save_batch(Vec::new(), true).await.unwrap();
        repo.delete_batch_by_keys(Vec::new()).await.unwrap();

        assert_eq!(store.batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_batch_validates_before_writing() {
        let repo = repo();
        let mut models: Vec<Record> = (0..30).map(|i| record! { "id" => i }).collect();
        models.push(record! { "name" => "no key" });

        let err = repo.save_batch(models, true).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_batch_by_keys() {
        let repo = repo();
        let models = (0..30).map(|i| record! { "id" => i }).collect();
        repo.save_batch(models, false).await.unwrap();

        let keys = (0..27).map(|i| record! { "id" => i }).collect();
        repo.delete_batch_by_keys(keys).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_all_by_primary_key() {
        let repo = composite_repo();
        for sk in ["2024-09-01", "2024-09-02", "2024-09-03"] {
            repo.save_with_composite_key(
                record! { "pk" => "tenant-123", "sk" => sk },
                SaveOptions::default(),
            )
            .await
            .unwrap();
        }
        repo.save_with_composite_key(
            record! { "pk" => "other", "sk" => "2024-09-01" },
            SaveOptions::default(),
        )
        .await
        .unwrap();

        let deleted = repo.delete_all_by_primary_key("tenant-123").await.unwrap();

        assert_eq!(deleted, 3);
        assert!(repo
            .find_all("tenant-123", &Filter::new())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_in_debug_mode_keeps_items() {
        let repo = composite_repo();
        repo.save_with_composite_key(record! { "pk" => "t", "sk" => "a" }, SaveOptions::default())
            .await
            .unwrap();

        let debug_repo = repo.clone().with_debug_mode(true);
        assert_eq!(debug_repo.delete_all_by_primary_key("t").await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_all_follows_pages_and_filters() {
        let repo = composite_repo();
        for (sk, status) in [("a", "active"), ("b", "inactive"), ("c", "active"), ("d", "active"), ("e", "inactive")] {
            repo.save_with_composite_key(
                record! { "pk" => "u1", "sk" => sk, "status" => status },
                SaveOptions::default(),
            )
            .await
            .unwrap();
        }

        let all = repo.find_all("u1", &Filter::new()).await.unwrap();
        assert_eq!(all.len(), 5);

        let active = repo
            .find_all("u1", &filter(json!({"status": "active"})))
            .await
            .unwrap();
        let sks: Vec<_> = active.iter().map(|r| r["sk"].clone()).collect();
        assert_eq!(sks, vec![Value::from("a"), Value::from("c"), Value::from("d")]);
    }

    #[tokio::test]
    async fn test_find_all_with_empty_partition_value() {
        let repo = repo();
        assert!(repo.find_all("", &Filter::new()).await.unwrap().is_empty());
        assert!(repo.find_all(Value::Null, &Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_with_index() {
        let repo = repo();
        for (id, email, age) in [("u1", "a@x.com", 17), ("u2", "b@x.com", 30), ("u3", "a@x.com", 40)] {
            repo.save(id, record! { "email" => email, "age" => age }, SaveOptions::default())
                .await
                .unwrap();
        }

        let adults = repo
            .find_all_with_index("email-index", "email", "a@x.com", &filter(json!({"age": {"ge": 18}})))
            .await
            .unwrap();
        assert_eq!(adults.len(), 1);
        assert_eq!(adults[0]["id"], Value::from("u3"));

        let first = repo
            .find_one_with_index("email-index", "email", "a@x.com", &Filter::new())
            .await
            .unwrap();
        assert_eq!(first.unwrap()["id"], Value::from("u1"));

        let none = repo
            .find_one_with_index("email-index", "email", "z@x.com", &Filter::new())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_load_all_streams_filtered_items() {
        let schema = KeySchema::new("id");
        let repo = GenericRepository::new(
            InMemoryStore::new(schema.clone()).with_page_size(2),
            "users",
            schema,
        );
        for (id, age) in [("a", 10), ("b", 20), ("c", 30), ("d", 40), ("e", 50)] {
            repo.save(id, record! { "age" => age }, SaveOptions::default())
                .await
                .unwrap();
        }

        let adults = filter(json!({"age": {"ge": 18}}));
        let items: Vec<Record> = repo
            .load_all(&adults)
            .map(|item| item.unwrap())
            .collect()
            .await;

        let ids: Vec<_> = items.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(
            ids,
            vec![Value::from("b"), Value::from("c"), Value::from("d"), Value::from("e")]
        );
    }

    #[tokio::test]
    async fn test_load_all_yields_store_error_and_stops() {
        let schema = KeySchema::new("id");
        let store = CountingStore::new(schema.clone()).failing_scans_after(1);
        let repo = GenericRepository::new(store, "users", schema);
        for id in ["a", "b", "c"] {
            repo.save(id, record! {}, SaveOptions::default()).await.unwrap();
        }

        let filter = Filter::new();
        let results: Vec<Result<Record>> = repo.load_all(&filter).collect().await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert_eq!(
            results[2],
            Err(RepositoryError::QueryFailed("scan unavailable".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_with_satisfied_condition() {
        let repo = repo();
        repo.save("item-1", record! { "status" => "active", "value" => 10 }, SaveOptions::default())
            .await
            .unwrap();

        let updated = repo
            .update(
                "item-1",
                record! { "value" => 20 },
                Some(&filter(json!({"status": "active"}))),
                None,
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["value"], Value::from(20));
        assert_eq!(updated["status"], Value::from("active"));
    }

    #[tokio::test]
    async fn test_update_rejection_carries_message() {
        let repo = repo();
        repo.save("item-2", record! { "status" => "inactive", "value" => 10 }, SaveOptions::default())
            .await
            .unwrap();

        let err = repo
            .update(
                "item-2",
                record! { "value" => 20 },
                Some(&filter(json!({"status": "active"}))),
                Some("Item must be active"),
            )
            .await
            .unwrap_err();

        assert_eq!(err, RepositoryError::ConditionFailed("Item must be active".to_string()));
        assert_eq!(err.code(), "ConditionalCheckFailedException");
        assert_eq!(repo.load("item-2").await.unwrap().unwrap()["value"], Value::from(10));
    }

    #[tokio::test]
    async fn test_update_rejection_default_message() {
        let repo = repo();
        let err = repo
            .update(
                "missing",
                record! { "value" => 1 },
                Some(&filter(json!({"status": "active"}))),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RepositoryError::ConditionFailed(DEFAULT_REJECTION_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_optimistic_locking() {
        let repo = repo();
        repo.save("doc-1", record! { "content" => "old", "version" => 5 }, SaveOptions::default())
            .await
            .unwrap();
        let lock = filter(json!({"version": 5}));

        let first = repo
            .update(
                "doc-1",
                record! { "content" => "new", "version" => 6 },
                Some(&lock),
                Some("Document was modified by another user"),
            )
            .await
            .unwrap();
        assert_eq!(first.unwrap()["version"], Value::from(6));

        let second = repo
            .update(
                "doc-1",
                record! { "content" => "another", "version" => 7 },
                Some(&lock),
                Some("Document was modified by another user"),
            )
            .await;
        assert!(second.unwrap_err().is_condition_failed());
    }

    #[tokio::test]
    async fn test_update_with_empty_conditions_is_unconditional() {
        let repo = repo();
        for conditions in [None, Some(Filter::new())] {
            let updated = repo
                .update("item", record! { "value" => 1 }, conditions.as_ref(), None)
                .await
                .unwrap();
            assert_eq!(updated.unwrap()["value"], Value::from(1));
        }
    }

    #[tokio::test]
    async fn test_update_with_presence_and_membership_conditions() {
        let repo = repo();
        repo.save(
            "task-1",
            record! { "status" => "in_progress", "assignee" => "john@example.com" },
            SaveOptions::default(),
        )
        .await
        .unwrap();
        repo.save("order-1", record! { "status" => "shipped", "quantity" => 2 }, SaveOptions::default())
            .await
            .unwrap();

        let completed = repo
            .update(
                "task-1",
                record! { "status" => "completed" },
                Some(&filter(json!({"status": "in_progress", "assignee": {"exists": true}}))),
                None,
            )
            .await
            .unwrap();
        assert_eq!(completed.unwrap()["status"], Value::from("completed"));

        let err = repo
            .update(
                "order-1",
                record! { "quantity" => 3 },
                Some(&filter(json!({"status": {"in": ["pending", "processing"]}}))),
                Some("Cannot modify orders that have shipped"),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Condition check failed: Cannot modify orders that have shipped"
        );
    }

    #[tokio::test]
    async fn test_update_by_composite_key() {
        let repo = composite_repo();
        let key = record! { "pk" => "doc", "sk" => "v1" };
        repo.save_with_composite_key(
            record! { "pk" => "doc", "sk" => "v1", "status" => "draft" },
            SaveOptions::default(),
        )
        .await
        .unwrap();

        let updated = repo
            .update_by_composite_key(
                &key,
                record! { "status" => "published" },
                Some(&filter(json!({"status": "draft"}))),
                Some("Can only update draft documents"),
            )
            .await
            .unwrap();
        assert_eq!(updated.unwrap()["status"], Value::from("published"));

        let err = repo
            .update_by_composite_key(
                &key,
                record! { "status" => "archived" },
                Some(&filter(json!({"status": "draft"}))),
                Some("Can only update draft documents"),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::ConditionFailed("Can only update draft documents".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_cannot_change_key() {
        let repo = repo();
        let err = repo
            .update("a", record! { "id" => "b" }, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));

        let updated = repo
            .update("a", record! { "id" => "a", "v" => 1 }, None, None)
            .await
            .unwrap();
        assert_eq!(updated.unwrap(), record! { "id" => "a", "v" => 1 });
    }

    #[tokio::test]
    async fn test_update_requires_attributes() {
        let err = repo().update("a", record! {}, None, None).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::InvalidData("No attributes to update".to_string())
        );
    }

    /// Wraps an in-memory store, counting batch calls and optionally
    /// failing scans after a number of pages.
    #[derive(Clone)]
    struct CountingStore {
        inner: InMemoryStore,
        batches: Arc<AtomicUsize>,
        scans: Arc<AtomicUsize>,
        fail_scans_after: Option<usize>,
    }

    impl CountingStore {
        fn new(schema: KeySchema) -> Self {
            Self {
                inner: InMemoryStore::new(schema).with_page_size(2),
                batches: Arc::new(AtomicUsize::new(0)),
                scans: Arc::new(AtomicUsize::new(0)),
                fail_scans_after: None,
            }
        }

        fn failing_scans_after(mut self, pages: usize) -> Self {
            self.fail_scans_after = Some(pages);
            self
        }
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn get_item(&self, key: &Record) -> Result<Option<Record>> {
            self.inner.get_item(key).await
        }

        async fn put_item(&self, item: Record) -> Result<()> {
            self.inner.put_item(item).await
        }

        async fn delete_item(&self, key: &Record) -> Result<()> {
            self.inner.delete_item(key).await
        }

        async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<()> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.inner.write_batch(requests).await
        }

        async fn query_page(&self, query: &KeyQuery, start: Option<Record>) -> Result<Page> {
            self.inner.query_page(query, start).await
        }

        async fn scan_page(&self, start: Option<Record>) -> Result<Page> {
            let scanned = self.scans.fetch_add(1, Ordering::SeqCst);
            if self.fail_scans_after.is_some_and(|limit| scanned >= limit) {
                return Err(RepositoryError::QueryFailed("scan unavailable".to_string()));
            }
            self.inner.scan_page(start).await
        }

        async fn update_item(
            &self,
            key: &Record,
            updates: Record,
            condition: Option<&Filter>,
        ) -> Result<Record> {
            self.inner.update_item(key, updates, condition).await
        }

        async fn item_count(&self) -> Result<u64> {
            self.inner.item_count().await
        }
    }
}
