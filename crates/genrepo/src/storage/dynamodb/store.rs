//! DynamoDB record store implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{self, ReturnValue};
use aws_sdk_dynamodb::Client;

use genrepo_core::filter::Filter;
use genrepo_core::record::Record;
use genrepo_core::storage::{
    check_condition, KeyQuery, Page, RecordStore, RepositoryError, Result, WriteRequest,
    DEFAULT_REJECTION_MESSAGE, MAX_BATCH_WRITE,
};

use super::conversions::{item_to_record, record_to_item, value_to_attribute, Item};
use super::error::{
    map_batch_write_error, map_delete_item_error, map_describe_table_error, map_get_item_error,
    map_put_item_error, map_query_error, map_scan_error, map_update_item_error,
};
use super::expression::{guard_expression, update_expression, Expression};

const DEFAULT_MAX_BATCH_RETRIES: u32 = 5;
const BATCH_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);
const BATCH_RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
const MAX_CONDITIONAL_UPDATE_ATTEMPTS: u32 = 3;

/// DynamoDB-based record store for a single table.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
    max_batch_retries: u32,
}

impl DynamoDbStore {
    /// Creates a new store with the given DynamoDB client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            max_batch_retries: DEFAULT_MAX_BATCH_RETRIES,
        }
    }

    /// Sets how many times unprocessed batch items are resubmitted.
    pub fn with_max_batch_retries(mut self, retries: u32) -> Self {
        self.max_batch_retries = retries;
        self
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn read_item(&self, key: &Record, consistent: bool) -> Result<Option<Record>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(record_to_item(key)?))
            .consistent_read(consistent)
            .send()
            .await
            .map_err(|e| map_get_item_error(e, &self.table_name))?;

        result.item.as_ref().map(item_to_record).transpose()
    }

    async fn send_update(
        &self,
        key: &Record,
        update: &Expression,
        guard: Option<Expression>,
    ) -> Result<Record> {
        let mut names = update.names.clone();
        let mut values = update.values.clone();
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(record_to_item(key)?))
            .update_expression(&update.text)
            .return_values(ReturnValue::AllNew);

        if let Some(guard) = guard.filter(|guard| !guard.text.is_empty()) {
            names.extend(guard.names);
            values.extend(guard.values);
            request = request.condition_expression(guard.text);
        }

        let values = values
            .iter()
            .map(|(placeholder, value)| -> Result<_> {
                Ok((placeholder.clone(), value_to_attribute(placeholder, value)?))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let result = request
            .set_expression_attribute_names(Some(names.into_iter().collect()))
            .set_expression_attribute_values(Some(values))
            .send()
            .await
            .map_err(|e| map_update_item_error(e, &self.table_name))?;

        result
            .attributes
            .as_ref()
            .map(item_to_record)
            .transpose()?
            .ok_or_else(|| RepositoryError::QueryFailed("UpdateItem returned no item".to_string()))
    }
}

/// Backoff before resubmitting unprocessed items on retry `attempt` (from 1).
fn batch_retry_delay(attempt: u32) -> Duration {
    BATCH_RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(BATCH_RETRY_MAX_DELAY)
}

fn page_from(items: Option<Vec<Item>>, last_evaluated_key: Option<Item>) -> Result<Page> {
    Ok(Page {
        items: items
            .unwrap_or_default()
            .iter()
            .map(item_to_record)
            .collect::<Result<_>>()?,
        last_evaluated_key: last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(|key| item_to_record(&key))
            .transpose()?,
    })
}

fn to_sdk_write_request(request: &WriteRequest) -> Result<types::WriteRequest> {
    let build_error = |e: aws_sdk_dynamodb::error::BuildError| {
        RepositoryError::Serialization(format!("Invalid batch request: {}", e))
    };

    Ok(match request {
        WriteRequest::Put(item) => types::WriteRequest::builder()
            .put_request(
                types::PutRequest::builder()
                    .set_item(Some(record_to_item(item)?))
                    .build()
                    .map_err(build_error)?,
            )
            .build(),
        WriteRequest::Delete(key) => types::WriteRequest::builder()
            .delete_request(
                types::DeleteRequest::builder()
                    .set_key(Some(record_to_item(key)?))
                    .build()
                    .map_err(build_error)?,
            )
            .build(),
    })
}

#[async_trait]
impl RecordStore for DynamoDbStore {
    async fn get_item(&self, key: &Record) -> Result<Option<Record>> {
        self.read_item(key, false).await
    }

    async fn put_item(&self, item: Record) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(&item)?))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, &self.table_name))?;

        Ok(())
    }

    async fn delete_item(&self, key: &Record) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(record_to_item(key)?))
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, &self.table_name))?;

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

        let mut pending = requests
            .iter()
            .map(to_sdk_write_request)
            .collect::<Result<Vec<_>>>()?;
        let mut attempt = 0;

        while !pending.is_empty() {
            let result = self
                .client
                .batch_write_item()
                .request_items(&self.table_name, pending)
                .send()
                .await
                .map_err(|e| map_batch_write_error(e, &self.table_name))?;

            pending = result
                .unprocessed_items
                .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
                .unwrap_or_default();

            if pending.is_empty() {
                break;
            }
            if attempt >= self.max_batch_retries {
                return Err(RepositoryError::QueryFailed(format!(
                    "BatchWriteItem left {} unprocessed items after {} retries",
                    pending.len(),
                    attempt
                )));
            }

            attempt += 1;
            tracing::warn!(
                table = %self.table_name,
                unprocessed = pending.len(),
                attempt,
                "Retrying unprocessed batch items"
            );
            tokio::time::sleep(batch_retry_delay(attempt)).await;
        }

        Ok(())
    }

    async fn query_page(&self, query: &KeyQuery, start: Option<Record>) -> Result<Page> {
        let start = start.as_ref().map(record_to_item).transpose()?;

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_index_name(query.index_name.clone())
            .key_condition_expression("#k = :k")
            .expression_attribute_names("#k", &query.key_name)
            .expression_attribute_values(
                ":k",
                value_to_attribute(&query.key_name, &query.key_value)?,
            )
            .set_exclusive_start_key(start)
            .send()
            .await
            .map_err(|e| map_query_error(e, &self.table_name))?;

        tracing::trace!(
            table = %self.table_name,
            count = result.count,
            "Fetched query page"
        );
        page_from(result.items, result.last_evaluated_key)
    }

    async fn scan_page(&self, start: Option<Record>) -> Result<Page> {
        let start = start.as_ref().map(record_to_item).transpose()?;

        let result = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(start)
            .send()
            .await
            .map_err(|e| map_scan_error(e, &self.table_name))?;

        tracing::trace!(
            table = %self.table_name,
            count = result.count,
            "Fetched scan page"
        );
        page_from(result.items, result.last_evaluated_key)
    }

    async fn update_item(
        &self,
        key: &Record,
        updates: Record,
        condition: Option<&Filter>,
    ) -> Result<Record> {
        let update = update_expression(&updates)
            .ok_or_else(|| RepositoryError::InvalidData("No attributes to update".to_string()))?;

        let Some(condition) = condition.filter(|condition| !condition.is_empty()) else {
            return self.send_update(key, &update, None).await;
        };

        // The condition is checked client-side against a consistent read; the
        // write is then guarded so it only lands if that read is still current.
        for attempt in 1..=MAX_CONDITIONAL_UPDATE_ATTEMPTS {
            let current = self.read_item(key, true).await?;
            check_condition(current.as_ref(), condition)?;

            let attributes = condition
                .clauses()
                .iter()
                .map(|clause| clause.attribute.as_str());
            let guard = guard_expression(key, attributes, current.as_ref());

            match self.send_update(key, &update, Some(guard)).await {
                Err(err) if err.is_condition_failed() => {
                    tracing::debug!(
                        table = %self.table_name,
                        attempt,
                        "Item changed between read and conditional update"
                    );
                }
                result => return result,
            }
        }

        Err(RepositoryError::ConditionFailed(
            DEFAULT_REJECTION_MESSAGE.to_string(),
        ))
    }

    async fn item_count(&self) -> Result<u64> {
        let result = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| map_describe_table_error(e, &self.table_name))?;

        let count = result
            .table
            .and_then(|table| table.item_count)
            .unwrap_or_default();
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
