//! Rendering of write guards and updates into DynamoDB expressions.
//!
//! Attribute names and values are always bound through `#name` and `:value`
//! placeholders, so reserved words and special characters need no escaping.

use std::collections::{BTreeMap, BTreeSet};

use genrepo_core::record::{Record, Value};

/// An expression with its placeholder bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub text: String,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

struct Placeholders {
    prefix: &'static str,
    names: BTreeMap<String, String>,
    values: BTreeMap<String, Value>,
}

impl Placeholders {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            names: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    fn name(&mut self, attribute: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, a)| *a == attribute) {
            return placeholder.clone();
        }
        let placeholder = format!("#{}{}", self.prefix, self.names.len());
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, value: &Value) -> String {
        let placeholder = format!(":{}{}", self.prefix, self.values.len());
        self.values.insert(placeholder.clone(), value.clone());
        placeholder
    }

    fn finish(self, text: String) -> Expression {
        Expression {
            text,
            names: self.names,
            values: self.values,
        }
    }
}

/// Renders a `ConditionExpression` that holds only while the item is as it
/// was read.
///
/// An absent item must still be absent. A present item must still exist with
/// every attribute in `attributes` unchanged, or still missing if it was
/// missing. Conditions are evaluated client-side against that read, so this
/// guard is what makes the write conditional on the server.
pub fn guard_expression<'a>(
    key: &Record,
    attributes: impl IntoIterator<Item = &'a str>,
    current: Option<&Record>,
) -> Expression {
    let mut placeholders = Placeholders::new("g");
    let mut terms = Vec::new();

    if let Some(key_attribute) = key.keys().next() {
        let name = placeholders.name(key_attribute);
        terms.push(match current {
            Some(_) => format!("attribute_exists({name})"),
            None => format!("attribute_not_exists({name})"),
        });
    }

    if let Some(current) = current {
        let mut pinned = BTreeSet::new();
        for attribute in attributes {
            if !pinned.insert(attribute) {
                continue;
            }
            let name = placeholders.name(attribute);
            terms.push(match current.get(attribute) {
                Some(value) => format!("{} = {}", name, placeholders.value(value)),
                None => format!("attribute_not_exists({name})"),
            });
        }
    }

    placeholders.finish(terms.join(" AND "))
}

/// Renders `SET` assignments for every attribute of `updates`.
///
/// Returns `None` when there is nothing to set.
pub fn update_expression(updates: &Record) -> Option<Expression> {
    if updates.is_empty() {
        return None;
    }
    let mut placeholders = Placeholders::new("u");
    let assignments = updates
        .iter()
        .map(|(attribute, value)| {
            let name = placeholders.name(attribute);
            let value = placeholders.value(value);
            format!("{} = {}", name, value)
        })
        .collect::<Vec<_>>()
        .join(", ");
    Some(placeholders.finish(format!("SET {}", assignments)))
}
