//! Key schema and pure key helpers.

use crate::record::{Record, Value};

use super::{RepositoryError, Result};

/// Partition key and optional sort key attribute names of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Key attribute names, partition key first.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }

    /// Key for a table addressed by partition key alone.
    pub fn simple_key(&self, value: impl Into<Value>) -> Result<Record> {
        let value = value.into();
        check_scalar(&self.partition_key, &value)?;
        let mut key = Record::new();
        key.insert(self.partition_key.clone(), value);
        Ok(key)
    }

    /// Validates a caller-supplied key against the schema.
    ///
    /// Every key attribute must be present and be a string, number or binary.
    /// Attributes outside the schema are rejected.
    pub fn composite_key(&self, key: &Record) -> Result<Record> {
        let mut out = Record::new();
        for name in self.attributes() {
            let value = key.get(name).ok_or_else(|| {
                RepositoryError::InvalidKey(format!("missing key attribute '{name}'"))
            })?;
            check_scalar(name, value)?;
            out.insert(name.to_string(), value.clone());
        }
        if let Some(extra) = key.keys().find(|k| !out.contains_key(k.as_str())) {
            return Err(RepositoryError::InvalidKey(format!(
                "'{extra}' is not a key attribute"
            )));
        }
        Ok(out)
    }

    /// Extracts the key attributes from a full item.
    pub fn key_of(&self, item: &Record) -> Result<Record> {
        let key: Record = self
            .attributes()
            .filter_map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();
        self.composite_key(&key)
    }

    /// The item to write: `model` with the key attributes of `key` set.
    pub fn merge_key(&self, model: &Record, key: &Record) -> Record {
        let mut item = model.clone();
        item.extend(key.iter().map(|(k, v)| (k.clone(), v.clone())));
        item
    }

    /// Human-readable `name=value` rendering of a key, for errors and logs.
    pub fn describe(&self, key: &Record) -> String {
        self.attributes()
            .filter_map(|name| key.get(name).map(|v| format!("{name}={v}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn check_scalar(name: &str, value: &Value) -> Result<()> {
    if value.is_key_scalar() {
        Ok(())
    } else {
        Err(RepositoryError::InvalidKey(format!(
            "key attribute '{name}' must be S, N or B, got {}",
            value.type_name()
        )))
    }
}
