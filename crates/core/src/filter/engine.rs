//! Evaluation driver: compiled filters, `matches`, and lazy `apply`.

use std::borrow::Borrow;

use futures_util::future;
use futures_util::stream::{Stream, StreamExt};

use crate::record::Record;

use super::clause::{normalize, CanonicalClause, Clause};
use super::error::{InvalidFilterError, InvalidFilterReason, WHOLE_FILTER};
use super::operators::evaluate;

/// A normalized, conjunctive filter.
///
/// Built once (failing fast on malformed clauses) and then evaluated any
/// number of times. The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<CanonicalClause>,
}

impl Filter {
    /// The empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a JSON filter document of the form `{attr: clause, ...}`.
    ///
    /// `null` and `{}` yield the empty filter.
    ///
    /// ```
    /// use genrepo_core::filter::Filter;
    /// use serde_json::json;
    ///
    /// let filter = Filter::parse(&json!({"status": "active", "age": {"ge": 18}})).unwrap();
    /// assert_eq!(filter.clauses().len(), 2);
    ///
    /// assert!(Filter::parse(&json!({"score": {"between": [1]}})).is_err());
    /// ```
    pub fn parse(json: &serde_json::Value) -> Result<Self, InvalidFilterError> {
        match json {
            serde_json::Value::Null => Ok(Self::new()),
            serde_json::Value::Object(map) => Self::from_clauses(
                map.iter()
                    .map(|(attr, clause)| (attr.clone(), Clause::from_json(clause.clone()))),
            ),
            _ => Err(InvalidFilterError::new(
                WHOLE_FILTER,
                InvalidFilterReason::NotAnObject,
            )),
        }
    }

    /// Normalizes `(attribute, clause)` pairs in order.
    pub fn from_clauses<I, K>(clauses: I) -> Result<Self, InvalidFilterError>
    where
        I: IntoIterator<Item = (K, Clause)>,
        K: AsRef<str>,
    {
        let clauses = clauses
            .into_iter()
            .map(|(attr, clause)| normalize(attr.as_ref(), &clause))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clauses })
    }

    /// Adds a clause. Several clauses may target the same attribute.
    pub fn and(mut self, attribute: &str, clause: Clause) -> Result<Self, InvalidFilterError> {
        self.clauses.push(normalize(attribute, &clause)?);
        Ok(self)
    }

    pub fn clauses(&self) -> &[CanonicalClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl TryFrom<&serde_json::Value> for Filter {
    type Error = InvalidFilterError;

    fn try_from(json: &serde_json::Value) -> Result<Self, Self::Error> {
        Filter::parse(json)
    }
}

/// True iff `record` satisfies every clause of `filter`.
///
/// Stops at the first unsatisfied clause.
pub fn matches(record: &Record, filter: &Filter) -> bool {
    filter.clauses.iter().all(|clause| evaluate(clause, record))
}

/// Lazily yields the records that satisfy `filter`, in input order.
pub fn apply<I>(records: I, filter: &Filter) -> Apply<'_, I::IntoIter>
where
    I: IntoIterator,
    I::Item: Borrow<Record>,
{
    Apply {
        records: records.into_iter(),
        filter,
    }
}

/// Iterator returned by [`apply`].
#[derive(Debug, Clone)]
pub struct Apply<'f, I> {
    records: I,
    filter: &'f Filter,
}

impl<I> Iterator for Apply<'_, I>
where
    I: Iterator,
    I::Item: Borrow<Record>,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.records
            .by_ref()
            .find(|record| matches(<I::Item as Borrow<Record>>::borrow(record), filter))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.records.size_hint().1)
    }
}

/// Filters a fallible record stream as items arrive.
///
/// Errors are passed through so the consumer decides whether to stop.
pub fn apply_stream<'f, S, T, E>(
    records: S,
    filter: &'f Filter,
) -> impl Stream<Item = Result<T, E>> + 'f
where
    S: Stream<Item = Result<T, E>> + 'f,
    T: Borrow<Record> + 'f,
    E: 'f,
{
    records.filter(move |item| {
        future::ready(match item {
            Ok(record) => matches(<T as Borrow<Record>>::borrow(record), filter),
            Err(_) => true,
        })
    })
}
