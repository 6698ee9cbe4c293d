//! Configuration loading and representation.
//!
//! Everything is read from environment variables; each loader also has a
//! `from_lookup` form taking a closure so tests don't touch process state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderflow_orders::StockGuard;

/// Env var selecting the stock guard (`cas` | `compare_and_swap` | `overwrite`).
pub const STOCK_GUARD_VAR: &str = "ORDERFLOW_STOCK_GUARD";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Workflow tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub stock_guard: StockGuard,
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unknown values fall back to the default guard with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let stock_guard = match lookup(STOCK_GUARD_VAR) {
            None => StockGuard::default(),
            Some(raw) => parse_stock_guard(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown {STOCK_GUARD_VAR}; using compare-and-swap");
                StockGuard::default()
            }),
        };

        Self { stock_guard }
    }
}

pub fn parse_stock_guard(raw: &str) -> Option<StockGuard> {
    match raw.trim().to_lowercase().as_str() {
        "cas" | "compare_and_swap" | "compare-and-swap" => Some(StockGuard::CompareAndSwap),
        "overwrite" => Some(StockGuard::Overwrite),
        _ => None,
    }
}

/// Postgres connection settings.
#[cfg(feature = "postgres")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[cfg(feature = "postgres")]
impl DatabaseConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => Self::DEFAULT_MAX_CONNECTIONS,
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "DATABASE_MAX_CONNECTIONS",
                value: raw,
            })?,
        };

        Ok(Self {
            url,
            max_connections,
        })
    }

    pub async fn connect(&self) -> Result<sqlx::PgPool, sqlx::Error> {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_guard_is_compare_and_swap() {
        let config = WorkflowConfig::from_lookup(lookup(&[]));
        assert_eq!(config.stock_guard, StockGuard::CompareAndSwap);
    }

    #[test]
    fn overwrite_is_case_insensitive() {
        let config = WorkflowConfig::from_lookup(lookup(&[(STOCK_GUARD_VAR, " OverWrite ")]));
        assert_eq!(config.stock_guard, StockGuard::Overwrite);
    }

    #[test]
    fn unknown_guard_falls_back_to_default() {
        let config = WorkflowConfig::from_lookup(lookup(&[(STOCK_GUARD_VAR, "yolo")]));
        assert_eq!(config, WorkflowConfig::default());
    }

    #[test]
    fn config_deserializes_snake_case_guard() {
        let config: WorkflowConfig = serde_json::from_str(r#"{"stock_guard":"overwrite"}"#).unwrap();
        assert_eq!(config.stock_guard, StockGuard::Overwrite);
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn database_url_is_required() {
        let err = DatabaseConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn max_connections_must_be_numeric() {
        let err = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/orderflow"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DATABASE_MAX_CONNECTIONS", .. }));
    }
}
