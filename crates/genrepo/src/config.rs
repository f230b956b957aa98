use std::env;

use genrepo_core::storage::KeySchema;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Repository configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Table name (required)
    pub table_name: String,
    /// Partition key attribute (default: "id")
    pub primary_key: String,
    /// Sort key attribute, for composite-key tables
    pub sort_key: Option<String>,
    /// Days until saved items expire, if expiration is enabled
    pub data_expiration_days: Option<u32>,
    /// Skip all writes (default: false)
    pub debug_mode: bool,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Custom endpoint URL (for local DynamoDB)
    pub endpoint_url: Option<String>,
}

impl RepositoryConfig {
    /// Configuration for `table_name` with every other setting at its default.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: "id".to_string(),
            sort_key: None,
            data_expiration_days: None,
            debug_mode: false,
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GENREPO_TABLE_NAME` - Table name (required)
    /// - `GENREPO_PRIMARY_KEY` - Partition key attribute (default: "id")
    /// - `GENREPO_SORT_KEY` - Sort key attribute (default: none)
    /// - `GENREPO_EXPIRATION_DAYS` - Item expiration in days (default: none)
    /// - `GENREPO_DEBUG_MODE` - "true"/"1" to skip writes (default: false)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `AWS_ENDPOINT_URL` - Custom endpoint URL (default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`RepositoryConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table_name = lookup("GENREPO_TABLE_NAME")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("GENREPO_TABLE_NAME"))?;

        let data_expiration_days = match lookup("GENREPO_EXPIRATION_DAYS") {
            Some(v) => Some(v.parse().map_err(|_| ConfigError::Invalid {
                name: "GENREPO_EXPIRATION_DAYS",
                value: v.clone(),
            })?),
            None => None,
        };

        let debug_mode = match lookup("GENREPO_DEBUG_MODE") {
            Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid {
                name: "GENREPO_DEBUG_MODE",
                value: v,
            })?,
            None => false,
        };

        Ok(Self {
            table_name,
            primary_key: lookup("GENREPO_PRIMARY_KEY").unwrap_or_else(|| "id".to_string()),
            sort_key: lookup("GENREPO_SORT_KEY").filter(|v| !v.is_empty()),
            data_expiration_days,
            debug_mode,
            region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|v| !v.is_empty()),
        })
    }

    /// Key schema described by `primary_key` and `sort_key`.
    pub fn key_schema(&self) -> KeySchema {
        let schema = KeySchema::new(&self.primary_key);
        match &self.sort_key {
            Some(sort_key) => schema.with_sort_key(sort_key),
            None => schema,
        }
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_default_values() {
        let config = RepositoryConfig::from_lookup(lookup(&[("GENREPO_TABLE_NAME", "users")]))
            .unwrap();

        assert_eq!(config, RepositoryConfig::new("users"));
        assert_eq!(config.key_schema(), KeySchema::new("id"));
    }

    #[test]
    fn test_all_values() {
        let config = RepositoryConfig::from_lookup(lookup(&[
            ("GENREPO_TABLE_NAME", "orders"),
            ("GENREPO_PRIMARY_KEY", "customer"),
            ("GENREPO_SORT_KEY", "order"),
            ("GENREPO_EXPIRATION_DAYS", "30"),
            ("GENREPO_DEBUG_MODE", "true"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ENDPOINT_URL", "http://localhost:8000"),
        ]))
        .unwrap();

        assert_eq!(config.data_expiration_days, Some(30));
        assert!(config.debug_mode);
        assert_eq!(
            config.key_schema(),
            KeySchema::new("customer").with_sort_key("order")
        );
        assert_eq!(config.target_display(), "Local DynamoDB (http://localhost:8000)");
    }

    #[test]
    fn test_missing_table_name() {
        assert_eq!(
            RepositoryConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("GENREPO_TABLE_NAME"))
        );
    }

    #[test]
    fn test_invalid_expiration_days() {
        let err = RepositoryConfig::from_lookup(lookup(&[
            ("GENREPO_TABLE_NAME", "t"),
            ("GENREPO_EXPIRATION_DAYS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for GENREPO_EXPIRATION_DAYS: soon");
    }

    #[test]
    fn test_debug_mode_flag_values() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("False"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
