//! Table configuration types (Functional Core - pure data).

use std::str::FromStr;

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub gsis: Vec<GsiConfig>,
    pub billing_mode: BillingMode,
    /// Attribute holding the expiration epoch, when TTL is enabled.
    pub ttl_attribute: Option<String>,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// DynamoDB scalar attribute types allowed in keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

/// Global Secondary Index configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsiConfig {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub projection: ProjectionType,
}

/// GSI projection type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionType {
    All,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

impl TableConfig {
    /// A pay-per-request table keyed by `partition_key`, without indexes or TTL.
    pub fn new(table_name: &str, partition_key: KeyAttribute) -> Self {
        Self {
            table_name: table_name.to_string(),
            partition_key,
            sort_key: None,
            gsis: Vec::new(),
            billing_mode: BillingMode::PayPerRequest,
            ttl_attribute: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: Option<KeyAttribute>) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn with_gsis(mut self, gsis: Vec<GsiConfig>) -> Self {
        self.gsis = gsis;
        self
    }

    pub fn with_ttl_attribute(mut self, attribute: Option<&str>) -> Self {
        self.ttl_attribute = attribute.map(str::to_string);
        self
    }
}

impl AttributeType {
    /// Type descriptor shown in plans.
    pub fn descriptor(&self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
            AttributeType::Binary => "B",
        }
    }
}

impl FromStr for AttributeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "S" | "STRING" => Ok(AttributeType::String),
            "N" | "NUMBER" => Ok(AttributeType::Number),
            "B" | "BINARY" => Ok(AttributeType::Binary),
            other => Err(format!("unknown key type '{other}' (expected S, N or B)")),
        }
    }
}

/// `name` or `name:TYPE`, where TYPE is S, N or B (default S).
impl FromStr for KeyAttribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, attribute_type) = match s.split_once(':') {
            Some((name, ty)) => (name, ty.parse()?),
            None => (s, AttributeType::String),
        };
        if name.is_empty() {
            return Err(format!("missing attribute name in '{s}'"));
        }
        Ok(KeyAttribute {
            name: name.to_string(),
            attribute_type,
        })
    }
}

/// `INDEX=PARTITION[,SORT]`, each key written as for [`KeyAttribute`].
impl FromStr for GsiConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, keys) = s
            .split_once('=')
            .ok_or_else(|| format!("expected INDEX=PARTITION[,SORT], got '{s}'"))?;
        if name.is_empty() {
            return Err(format!("missing index name in '{s}'"));
        }
        let (partition_key, sort_key) = match keys.split_once(',') {
            Some((pk, sk)) => (pk.parse()?, Some(sk.parse()?)),
            None => (keys.parse()?, None),
        };
        Ok(GsiConfig {
            name: name.to_string(),
            partition_key,
            sort_key,
            projection: ProjectionType::All,
        })
    }
}
