//! Declared-type coercion.
//!
//! Pure functions that convert a value to a declared type, returning `None`
//! when the value has no representation in that type.

use std::fmt;

use crate::record::{Number, Value};

/// Type a clause forces its comparison into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    String,
    Number,
    Binary,
    Bool,
}

impl DeclaredType {
    /// Parses a type token: `S`, `N`, `B`, `BOOL` or their long names.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "S" | "STRING" => Some(Self::String),
            "N" | "NUMBER" => Some(Self::Number),
            "B" | "BINARY" => Some(Self::Binary),
            "BOOL" | "BOOLEAN" => Some(Self::Bool),
            _ => None,
        }
    }

    /// The store's type descriptor.
    pub fn token(self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
            Self::Bool => "BOOL",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Coerces a scalar to `ty`.
pub fn coerce(value: &Value, ty: DeclaredType) -> Option<Value> {
    match (ty, value) {
        (DeclaredType::Number, Value::Number(_)) => Some(value.clone()),
        (DeclaredType::Number, Value::String(s)) => Number::parse(s).map(Value::Number),

        (DeclaredType::String, Value::String(_)) => Some(value.clone()),
        (DeclaredType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (DeclaredType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (DeclaredType::Binary, Value::Binary(_)) => Some(value.clone()),
        (DeclaredType::Binary, Value::String(s)) => Some(Value::Binary(s.as_bytes().to_vec())),

        (DeclaredType::Bool, Value::Bool(_)) => Some(value.clone()),
        (DeclaredType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        _ => None,
    }
}

/// Coerces every element of a list or set to `ty`, dropping elements that
/// cannot be represented. Returns `None` for non-collections.
pub fn coerce_elements(value: &Value, ty: DeclaredType) -> Option<Value> {
    let elements = value.elements()?;
    Some(Value::List(
        elements.iter().filter_map(|e| coerce(e, ty)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tokens() {
        assert_eq!(DeclaredType::from_token("N"), Some(DeclaredType::Number));
        assert_eq!(DeclaredType::from_token("s"), Some(DeclaredType::String));
        assert_eq!(DeclaredType::from_token("bool"), Some(DeclaredType::Bool));
        assert_eq!(DeclaredType::from_token("binary"), Some(DeclaredType::Binary));
        assert_eq!(DeclaredType::from_token("SS"), None);
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(
            coerce(&Value::from("42"), DeclaredType::Number),
            Some(Value::from(42))
        );
        assert_eq!(coerce(&Value::from("forty"), DeclaredType::Number), None);
        assert_eq!(coerce(&Value::Bool(true), DeclaredType::Number), None);
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(
            coerce(&Value::from(7), DeclaredType::String),
            Some(Value::from("7"))
        );
        assert_eq!(
            coerce(&Value::Bool(false), DeclaredType::String),
            Some(Value::from("false"))
        );
        assert_eq!(coerce(&Value::Null, DeclaredType::String), None);
    }

    #[test]
    fn test_bool_and_binary_coercion() {
        assert_eq!(
            coerce(&Value::from("TRUE"), DeclaredType::Bool),
            Some(Value::Bool(true))
        );
        assert_eq!(coerce(&Value::from("yes"), DeclaredType::Bool), None);
        assert_eq!(
            coerce(&Value::from("ab"), DeclaredType::Binary),
            Some(Value::Binary(b"ab".to_vec()))
        );
    }

    #[test]
    fn test_element_coercion_drops_unrepresentable() {
        let list = Value::List(vec![Value::from("1"), Value::from("x"), Value::from(3)]);
        assert_eq!(
            coerce_elements(&list, DeclaredType::Number),
            Some(Value::List(vec![Value::from(1), Value::from(3)]))
        );
        assert_eq!(coerce_elements(&Value::from("1"), DeclaredType::Number), None);
    }
}
