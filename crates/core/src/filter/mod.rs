//! Client-side filter engine.
//!
//! A filter is a JSON-like document mapping attribute names to clauses:
//!
//! - `{"status": "active"}`: equality
//! - `{"age": {"gt": 18}}`: operator map
//! - `{"price": {"value": 19.99, "type": "N", "operator": "ge"}}`: type-explicit
//!
//! Clauses are normalized once into [`CanonicalClause`]s (failing fast with
//! [`InvalidFilterError`]) and then evaluated against records with AND
//! semantics. Evaluation never fails: a record that cannot satisfy a clause
//! is excluded.

mod clause;
mod coerce;
mod engine;
mod error;
mod operators;

pub use clause::{normalize, CanonicalClause, Clause, Operand, Operator};
pub use coerce::{coerce, DeclaredType};
pub use engine::{apply, apply_stream, matches, Apply, Filter};
pub use error::{InvalidFilterError, InvalidFilterReason, WHOLE_FILTER};
pub use operators::{compare, values_equal};
