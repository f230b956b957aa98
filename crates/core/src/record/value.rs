use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::Number;

/// A single item: attribute name to value.
pub type Record = BTreeMap<String, Value>;

/// A dynamically-typed attribute value.
///
/// The variants follow the data types of the backing store: scalars, lists,
/// maps and the three homogeneous set types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Vec<u8>),
    List(Vec<Value>),
    StringSet(Vec<String>),
    NumberSet(Vec<Number>),
    BinarySet(Vec<Vec<u8>>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short type label, matching the store's type descriptors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Number(_) => "N",
            Value::String(_) => "S",
            Value::Binary(_) => "B",
            Value::List(_) => "L",
            Value::StringSet(_) => "SS",
            Value::NumberSet(_) => "NS",
            Value::BinarySet(_) => "BS",
            Value::Map(_) => "M",
        }
    }

    /// True for string, number and binary values (valid key attribute types).
    pub fn is_key_scalar(&self) -> bool {
        matches!(self, Value::String(_) | Value::Number(_) | Value::Binary(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Elements of a list or set, each as a `Value`.
    ///
    /// Returns `None` for non-collection values.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::StringSet(items) => Some(items.iter().cloned().map(Value::String).collect()),
            Value::NumberSet(items) => Some(items.iter().cloned().map(Value::Number).collect()),
            Value::BinarySet(items) => Some(items.iter().cloned().map(Value::Binary).collect()),
            _ => None,
        }
    }

    /// True when the value has no meaningful content for a key lookup.
    pub fn is_empty_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Binary(b) => b.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Scalars print bare; collections print as JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_value_from_int!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no stored representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::try_from(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<DateTime<Utc>> for Value {
    /// Timestamps are stored as RFC 3339 strings.
    fn from(dt: DateTime<Utc>) -> Self {
        Value::String(dt.to_rfc3339())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Builds a [`Record`] from `(name, value)` pairs.
///
/// ```
/// use genrepo_core::record;
///
/// let item = record! { "id" => "user-1", "age" => 30 };
/// assert_eq!(item.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::record::Record::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut item = $crate::record::Record::new();
        $(
            item.insert(::std::string::String::from($name), $crate::record::Value::from($value));
        )+
        item
    }};
}
