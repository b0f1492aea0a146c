//! Service configuration from the environment.

use std::str::FromStr;
use thiserror::Error;

use crate::engine::LOW_STOCK_THRESHOLD;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Used for products that carry no threshold of their own, and for the
    /// `threshold` query parameter.
    pub low_stock_threshold: u32,
    pub max_line_items: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: 8083, low_stock_threshold: LOW_STOCK_THRESHOLD, max_line_items: 500 }
    }
}

impl Config {
    /// Reads `PORT`, `LOW_STOCK_THRESHOLD` and `MAX_LINE_ITEMS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: parse(&lookup, "PORT", defaults.port)?,
            low_stock_threshold: parse(&lookup, "LOW_STOCK_THRESHOLD", defaults.low_stock_threshold)?,
            max_line_items: parse(&lookup, "MAX_LINE_ITEMS", defaults.max_line_items)?,
        })
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[("PORT", "9000"), ("LOW_STOCK_THRESHOLD", " 15 ")])).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.low_stock_threshold, 15);
        assert_eq!(config.max_line_items, 500);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = Config::from_lookup(lookup(&[("LOW_STOCK_THRESHOLD", "ten")])).unwrap_err();
        assert_eq!(err.to_string(), r#"invalid value "ten" for LOW_STOCK_THRESHOLD"#);
    }
}
