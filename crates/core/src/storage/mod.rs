//! Storage contract shared by repository backends.

mod condition;
mod error;
mod keys;
mod traits;
mod ttl;
mod types;

pub use condition::check_condition;
pub use error::{RepositoryError, Result, DEFAULT_REJECTION_MESSAGE};
pub use keys::KeySchema;
pub use traits::{RecordStore, MAX_BATCH_WRITE};
pub use ttl::{expire_at_epoch, EXPIRE_AT_ATTRIBUTE};
pub use types::{KeyQuery, Page, WriteRequest};
