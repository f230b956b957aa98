//! Storage backend implementations.
//!
//! This module provides concrete implementations of the `RecordStore` trait
//! defined in `genrepo_core::storage`. Backends are selected at compile time
//! via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): in-process store for tests and offline use
//! - `dynamodb` (default): AWS DynamoDB backend using `aws-sdk-dynamodb`
//!
//! Build without DynamoDB:
//! ```bash
//! cargo build -p genrepo --no-default-features --features inmemory
//! ```

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;
