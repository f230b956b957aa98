//! In-memory storage backend for testing.
//!
//! This module provides an in-memory implementation of [`RecordStore`] that
//! keeps all items in a `BTreeMap` wrapped in `Arc<RwLock<_>>`. This is useful
//! for testing and offline scenarios where persistence is not required.
//!
//! # Example
//!
//! ```rust
//! use genrepo::storage::inmemory::InMemoryStore;
//! use genrepo_core::storage::KeySchema;
//!
//! let store = InMemoryStore::new(KeySchema::new("id")).with_page_size(10);
//! ```
//!
//! [`RecordStore`]: genrepo_core::storage::RecordStore

mod store;

pub use store::InMemoryStore;
