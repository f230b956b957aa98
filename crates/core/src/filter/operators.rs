//! Operator table: evaluation of a single canonical clause against a record.
//!
//! Nothing here fails. A clause whose operand and stored value cannot be
//! compared is simply unsatisfied.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::record::{Number, Record, Value};

use super::clause::{CanonicalClause, Operand, Operator};
use super::coerce::{coerce, coerce_elements};

/// True when `record` satisfies `clause`.
pub fn evaluate(clause: &CanonicalClause, record: &Record) -> bool {
    let stored = record.get(&clause.attribute);

    let stored = match (clause.operator, stored) {
        (Operator::Exists, found) => return found.is_some(),
        (Operator::NotExists, found) => return found.is_none(),
        (Operator::Ne, None) => return true,
        (_, None) => return false,
        (_, Some(value)) => value,
    };

    let stored = match clause.declared_type {
        Some(ty) => {
            let coerced = match clause.operator {
                Operator::Contains => {
                    coerce_elements(stored, ty).or_else(|| coerce(stored, ty))
                }
                _ => coerce(stored, ty),
            };
            match coerced {
                Some(value) => Cow::Owned(value),
                None => return false,
            }
        }
        None => Cow::Borrowed(stored),
    };
    let stored = stored.as_ref();

    match (&clause.operator, &clause.operand) {
        (Operator::Eq, Operand::Single(operand)) => values_equal(stored, operand),
        (Operator::Ne, Operand::Single(operand)) => !values_equal(stored, operand),
        (Operator::Lt, Operand::Single(operand)) => {
            compare(stored, operand) == Some(Ordering::Less)
        }
        (Operator::Le, Operand::Single(operand)) => matches!(
            compare(stored, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        (Operator::Gt, Operand::Single(operand)) => {
            compare(stored, operand) == Some(Ordering::Greater)
        }
        (Operator::Ge, Operand::Single(operand)) => matches!(
            compare(stored, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        (Operator::Between, Operand::Range(low, high)) => {
            matches!(
                compare(stored, low),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare(stored, high),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
        (Operator::In, Operand::Candidates(candidates)) => candidates
            .iter()
            .any(|candidate| values_equal(stored, candidate)),
        (Operator::Contains, Operand::Single(operand)) => contains(stored, operand),
        (Operator::BeginsWith, Operand::Single(operand)) => begins_with(stored, operand),
        // Normalization never pairs an operator with another operand shape.
        _ => false,
    }
}

/// Type-aware equality.
///
/// A numeric operand matches a stored numeric string; the reverse does not
/// hold. Sets compare without regard to order.
pub fn values_equal(stored: &Value, operand: &Value) -> bool {
    match (stored, operand) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(s), Value::Number(b)) => Number::parse(s).is_some_and(|a| a == *b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Binary(a), Value::Binary(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::StringSet(a), Value::StringSet(b)) => same_members(a, b, |x, y| x == y),
        (Value::NumberSet(a), Value::NumberSet(b)) => same_members(a, b, |x, y| x == y),
        (Value::BinarySet(a), Value::BinarySet(b)) => same_members(a, b, |x, y| x == y),
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => false,
    }
}

fn same_members<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| eq(x, y)))
        && b.iter().all(|y| a.iter().any(|x| eq(x, y)))
}

/// Ordering between a stored value and an operand, if they are comparable.
///
/// Numbers compare numerically, strings lexically by code point, binary
/// byte-wise. A stored numeric string is ordered numerically only against
/// a numeric operand.
pub fn compare(stored: &Value, operand: &Value) -> Option<Ordering> {
    match (stored, operand) {
        (Value::Number(a), Value::Number(b)) => a.compare(b),
        (Value::String(s), Value::Number(b)) => Number::parse(s)?.compare(b),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Binary(a), Value::Binary(b)) => Some(a.as_slice().cmp(b.as_slice())),
        _ => None,
    }
}

/// Substring of a string, or element of a list or set.
fn contains(stored: &Value, operand: &Value) -> bool {
    match (stored, operand) {
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (Value::String(_), _) => false,
        _ => stored
            .elements()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, operand))),
    }
}

/// Literal prefix of a string or binary value.
fn begins_with(stored: &Value, operand: &Value) -> bool {
    match (stored, operand) {
        (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
        (Value::Binary(b), Value::Binary(prefix)) => b.starts_with(prefix),
        _ => false,
    }
}
