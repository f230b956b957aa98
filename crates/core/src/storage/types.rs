use crate::record::{Record, Value};

/// One entry of a batch write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Put(Record),
    Delete(Record),
}

/// Partition-key equality query, optionally against a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyQuery {
    pub index_name: Option<String>,
    pub key_name: String,
    pub key_value: Value,
}

impl KeyQuery {
    pub fn table(key_name: impl Into<String>, key_value: impl Into<Value>) -> Self {
        Self {
            index_name: None,
            key_name: key_name.into(),
            key_value: key_value.into(),
        }
    }

    pub fn index(
        index_name: impl Into<String>,
        key_name: impl Into<String>,
        key_value: impl Into<Value>,
    ) -> Self {
        Self {
            index_name: Some(index_name.into()),
            key_name: key_name.into(),
            key_value: key_value.into(),
        }
    }
}

/// One page of a query or scan.
///
/// `last_evaluated_key` is set when more pages remain; pass it back as the
/// exclusive start key of the next call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub last_evaluated_key: Option<Record>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}
