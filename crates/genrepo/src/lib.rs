//! Generic key-value repository with client-side filtering.
//!
//! [`GenericRepository`] wraps any [`RecordStore`] backend with table-level
//! conventions (key handling, expiration, debug mode, batching, pagination)
//! and applies `genrepo_core` filters to every query and scan.
//!
//! [`RecordStore`]: genrepo_core::storage::RecordStore

pub mod config;
pub mod repository;
pub mod storage;

pub use config::{ConfigError, RepositoryConfig};
pub use repository::{GenericRepository, SaveOptions};
