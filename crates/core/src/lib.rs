//! Pure building blocks for the generic repository: the record model, the
//! client-side filter engine and the storage contract.

pub mod filter;
pub mod record;
pub mod storage;
