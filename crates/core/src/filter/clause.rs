//! Clause shapes and their normalization into [`CanonicalClause`].

use std::collections::BTreeMap;
use std::fmt;

use crate::record::Value;

use super::coerce::{coerce, DeclaredType};
use super::error::{InvalidFilterError, InvalidFilterReason};

/// Keys that mark a type-explicit clause.
const TYPE_EXPLICIT_KEYS: [&str; 3] = ["value", "type", "operator"];

/// A supported comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Between,
    In,
    Contains,
    BeginsWith,
    Exists,
    NotExists,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Between,
        Operator::In,
        Operator::Contains,
        Operator::BeginsWith,
        Operator::Exists,
        Operator::NotExists,
    ];

    /// The token used in filter documents.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::BeginsWith => "begins_with",
            Operator::Exists => "exists",
            Operator::NotExists => "not_exists",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    /// Presence checks carry no operand.
    pub fn takes_operand(self) -> bool {
        !matches!(self, Operator::Exists | Operator::NotExists)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The operand of a canonical clause, shaped by the operator's arity.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `exists` / `not_exists`.
    None,
    Single(Value),
    /// `between`: inclusive `[low, high]`.
    Range(Value, Value),
    /// `in`: candidate values.
    Candidates(Vec<Value>),
}

/// A clause after normalization: exactly one operator, a well-formed operand
/// and an optional declared type the operand has already been coerced to.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalClause {
    pub attribute: String,
    pub operator: Operator,
    pub operand: Operand,
    pub declared_type: Option<DeclaredType>,
}

/// A clause as written by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `{attr: V}`: implicit `eq`.
    Bare(Value),
    /// `{attr: {op: operand}}`.
    OperatorMap(BTreeMap<String, Value>),
    /// `{attr: {value: V, type: T, operator: op}}`.
    TypeExplicit {
        value: Option<Value>,
        declared_type: Option<String>,
        operator: Option<String>,
    },
}

impl Clause {
    /// Classifies a JSON clause.
    ///
    /// Objects whose keys are a non-empty subset of `value`, `type` and
    /// `operator` are type-explicit; other objects are operator maps; any
    /// other JSON value is a bare equality operand.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Object(map)
                if !map.is_empty()
                    && map
                        .keys()
                        .all(|k| TYPE_EXPLICIT_KEYS.contains(&k.as_str())) =>
            {
                let mut map = map;
                Clause::TypeExplicit {
                    value: map.remove("value").map(Value::from),
                    declared_type: map.remove("type").map(token_text),
                    operator: map.remove("operator").map(token_text),
                }
            }
            serde_json::Value::Object(map) => Clause::OperatorMap(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
            other => Clause::Bare(Value::from(other)),
        }
    }

    /// `{attr: V}`.
    pub fn eq(value: impl Into<Value>) -> Self {
        Clause::Bare(value.into())
    }

    /// `{attr: {op: operand}}`.
    pub fn op(operator: Operator, operand: impl Into<Value>) -> Self {
        Clause::OperatorMap(BTreeMap::from([(
            operator.token().to_string(),
            operand.into(),
        )]))
    }

    /// `{attr: {between: [low, high]}}`.
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::op(Operator::Between, Value::List(vec![low.into(), high.into()]))
    }

    /// `{attr: {in: [..]}}`.
    pub fn one_of<V: Into<Value>>(candidates: impl IntoIterator<Item = V>) -> Self {
        Self::op(
            Operator::In,
            Value::List(candidates.into_iter().map(Into::into).collect()),
        )
    }

    pub fn exists() -> Self {
        Self::op(Operator::Exists, true)
    }

    pub fn not_exists() -> Self {
        Self::op(Operator::NotExists, true)
    }

    /// `{attr: {value: V, type: T, operator: op}}`.
    pub fn typed(operator: Operator, value: impl Into<Value>, declared_type: DeclaredType) -> Self {
        Clause::TypeExplicit {
            value: Some(value.into()),
            declared_type: Some(declared_type.token().to_string()),
            operator: Some(operator.token().to_string()),
        }
    }
}

impl From<serde_json::Value> for Clause {
    fn from(json: serde_json::Value) -> Self {
        Clause::from_json(json)
    }
}

fn token_text(json: serde_json::Value) -> String {
    match json {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Resolves a clause to its canonical form.
pub fn normalize(attribute: &str, clause: &Clause) -> Result<CanonicalClause, InvalidFilterError> {
    let invalid = |reason| InvalidFilterError::new(attribute, reason);

    match clause {
        Clause::Bare(value) => build(attribute, Operator::Eq, Some(value.clone()), None),

        Clause::OperatorMap(map) => {
            let (operators, others): (Vec<_>, Vec<_>) = map
                .iter()
                .partition(|(key, _)| Operator::from_token(key).is_some());

            match operators.as_slice() {
                [] => match others.as_slice() {
                    [(key, _)] => Err(invalid(InvalidFilterReason::UnknownOperator(
                        key.to_string(),
                    ))),
                    _ => Err(invalid(InvalidFilterReason::NoOperator)),
                },
                [(token, operand)] if others.is_empty() => {
                    let operator = Operator::from_token(token)
                        .ok_or_else(|| invalid(InvalidFilterReason::NoOperator))?;
                    build(attribute, operator, Some((*operand).clone()), None)
                }
                [(token, _)] => Err(invalid(InvalidFilterReason::MixedKeys {
                    operator: token.to_string(),
                    keys: join_keys(&others),
                })),
                _ => Err(invalid(InvalidFilterReason::MultipleOperators(join_keys(
                    &operators,
                )))),
            }
        }

        Clause::TypeExplicit {
            value,
            declared_type,
            operator,
        } => {
            let operator = match operator {
                Some(token) => Operator::from_token(token)
                    .ok_or_else(|| invalid(InvalidFilterReason::UnknownOperator(token.clone())))?,
                None => Operator::Eq,
            };
            let declared_type = declared_type
                .as_deref()
                .map(|token| {
                    DeclaredType::from_token(token)
                        .ok_or_else(|| invalid(InvalidFilterReason::UnknownType(token.to_string())))
                })
                .transpose()?;
            build(attribute, operator, value.clone(), declared_type)
        }
    }
}

fn join_keys(entries: &[(&String, &Value)]) -> String {
    entries
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build(
    attribute: &str,
    operator: Operator,
    operand: Option<Value>,
    declared_type: Option<DeclaredType>,
) -> Result<CanonicalClause, InvalidFilterError> {
    let invalid = |reason| InvalidFilterError::new(attribute, reason);

    let operand = if !operator.takes_operand() {
        Operand::None
    } else {
        let value =
            operand.ok_or_else(|| invalid(InvalidFilterReason::MissingValue(operator.to_string())))?;
        match operator {
            Operator::Between => match value {
                Value::List(mut items) if items.len() == 2 => {
                    let high = items.pop().unwrap_or(Value::Null);
                    let low = items.pop().unwrap_or(Value::Null);
                    Operand::Range(low, high)
                }
                _ => return Err(invalid(InvalidFilterReason::BetweenArity)),
            },
            Operator::In => match value.elements() {
                Some(candidates) => Operand::Candidates(candidates),
                None => return Err(invalid(InvalidFilterReason::InRequiresList)),
            },
            _ => Operand::Single(value),
        }
    };

    let operand = match declared_type {
        Some(ty) => coerce_operand(operand, ty)
            .ok_or_else(|| invalid(InvalidFilterReason::Coercion(ty.to_string())))?,
        None => operand,
    };

    Ok(CanonicalClause {
        attribute: attribute.to_string(),
        operator,
        operand,
        declared_type,
    })
}

fn coerce_operand(operand: Operand, ty: DeclaredType) -> Option<Operand> {
    match operand {
        Operand::None => Some(Operand::None),
        Operand::Single(v) => coerce(&v, ty).map(Operand::Single),
        Operand::Range(low, high) => Some(Operand::Range(coerce(&low, ty)?, coerce(&high, ty)?)),
        Operand::Candidates(items) => items
            .iter()
            .map(|v| coerce(v, ty))
            .collect::<Option<Vec<_>>>()
            .map(Operand::Candidates),
    }
}
