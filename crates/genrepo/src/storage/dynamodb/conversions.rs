//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB `AttributeValue` maps and
//! records. These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use genrepo_core::record::{Number, Record, Value};
use genrepo_core::storage::RepositoryError;

/// A DynamoDB item.
pub type Item = HashMap<String, AttributeValue>;

/// Convert a record to a DynamoDB item.
pub fn record_to_item(record: &Record) -> Result<Item, RepositoryError> {
    record
        .iter()
        .map(|(name, value)| -> Result<_, RepositoryError> {
            Ok((name.clone(), value_to_attribute(name, value)?))
        })
        .collect()
}

/// Convert a DynamoDB item to a record.
pub fn item_to_record(item: &Item) -> Result<Record, RepositoryError> {
    item.iter()
        .map(|(name, attr)| -> Result<_, RepositoryError> {
            Ok((name.clone(), attribute_to_value(name, attr)?))
        })
        .collect()
}

/// Convert a value to an attribute value.
///
/// DynamoDB has no empty sets, so an empty set value is rejected.
pub fn value_to_attribute(name: &str, value: &Value) -> Result<AttributeValue, RepositoryError> {
    let empty_set = || {
        RepositoryError::Serialization(format!("Empty set is not allowed for attribute: {}", name))
    };

    Ok(match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Binary(b) => AttributeValue::B(Blob::new(b.clone())),
        Value::List(items) => AttributeValue::L(
            items
                .iter()
                .map(|v| value_to_attribute(name, v))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| -> Result<_, RepositoryError> {
                    Ok((k.clone(), value_to_attribute(k, v)?))
                })
                .collect::<Result<_, RepositoryError>>()?,
        ),
        Value::StringSet(set) if set.is_empty() => return Err(empty_set()),
        Value::StringSet(set) => AttributeValue::Ss(set.clone()),
        Value::NumberSet(set) if set.is_empty() => return Err(empty_set()),
        Value::NumberSet(set) => AttributeValue::Ns(set.iter().map(Number::to_string).collect()),
        Value::BinarySet(set) if set.is_empty() => return Err(empty_set()),
        Value::BinarySet(set) => {
            AttributeValue::Bs(set.iter().map(|b| Blob::new(b.clone())).collect())
        }
    })
}

/// Convert an attribute value to a value.
pub fn attribute_to_value(name: &str, attr: &AttributeValue) -> Result<Value, RepositoryError> {
    Ok(match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(name, n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::B(b) => Value::Binary(b.as_ref().to_vec()),
        AttributeValue::L(items) => Value::List(
            items
                .iter()
                .map(|a| attribute_to_value(name, a))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Map(
            map.iter()
                .map(|(k, a)| -> Result<_, RepositoryError> {
                    Ok((k.clone(), attribute_to_value(k, a)?))
                })
                .collect::<Result<_, RepositoryError>>()?,
        ),
        AttributeValue::Ss(set) => Value::StringSet(set.clone()),
        AttributeValue::Ns(set) => Value::NumberSet(
            set.iter()
                .map(|n| parse_number(name, n))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::Bs(set) => {
            Value::BinarySet(set.iter().map(|b| b.as_ref().to_vec()).collect())
        }
        _ => {
            return Err(RepositoryError::Serialization(format!(
                "Unsupported attribute type for field: {}",
                name
            )))
        }
    })
}

fn parse_number(name: &str, n: &str) -> Result<Number, RepositoryError> {
    Number::parse(n)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid number {}: {}", name, n)))
}
