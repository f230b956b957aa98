//! DynamoDB storage backend implementation.
//!
//! This module provides a DynamoDB-based implementation of [`RecordStore`]
//! using `aws-sdk-dynamodb`.
//!
//! [`RecordStore`]: genrepo_core::storage::RecordStore

mod client;
mod conversions;
mod error;
mod expression;
mod store;

pub use client::create_client;
pub use conversions::{item_to_record, record_to_item, Item};
pub use expression::{guard_expression, update_expression, Expression};
pub use store::DynamoDbStore;
