//! Query layer configuration
//!
//! Defaults handed to every result set a query object creates, plus the
//! logging level used by [`crate::utils::Logger`].
//!
//! # Example
//!
//! ```rust
//! use query_object::config::QueryConfig;
//!
//! let config = QueryConfig::from_json_str(r#"{ "items_per_page": 25 }"#)?;
//! assert_eq!(config.items_per_page, 25);
//! assert!(config.fetch_join_collection);
//! # Ok::<(), query_object::error::ConfigError>(())
//! ```

use crate::error::ConfigError;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "QUERY_OBJECT_";

/// Query layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Deduplicate root entities when paging fetch-joined queries
    pub fetch_join_collection: bool,

    /// Output walker preference for the paginating count; unset lets the engine decide
    pub use_output_walkers: Option<bool>,

    /// Default page size for [`crate::query::Paginator`]
    pub items_per_page: usize,

    /// Log level filter (`off`, `error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fetch_join_collection: true,
            use_output_walkers: None,
            items_per_page: 10,
            log_level: "info".to_string(),
        }
    }
}

impl QueryConfig {
    /// Parse a configuration from JSON; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: QueryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path of the JSON file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Apply `QUERY_OBJECT_*` environment overrides
    ///
    /// Recognized keys: `FETCH_JOIN_COLLECTION`, `USE_OUTPUT_WALKERS`
    /// (`true`, `false` or empty for unset), `ITEMS_PER_PAGE`, `LOG_LEVEL`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FETCH_JOIN_COLLECTION") {
            self.fetch_join_collection = parse_bool("fetch_join_collection", &raw)?;
        }
        if let Some(raw) = lookup("USE_OUTPUT_WALKERS") {
            self.use_output_walkers = if raw.trim().is_empty() {
                None
            } else {
                Some(parse_bool("use_output_walkers", &raw)?)
            };
        }
        if let Some(raw) = lookup("ITEMS_PER_PAGE") {
            self.items_per_page = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "items_per_page".to_string(),
                message: format!("expected a positive integer, got {:?}", raw),
            })?;
        }
        if let Some(raw) = lookup("LOG_LEVEL") {
            self.log_level = raw.trim().to_string();
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.items_per_page == 0 {
            return Err(ConfigError::Invalid {
                key: "items_per_page".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        self.log_level_filter()?;
        Ok(())
    }

    /// Parsed log level
    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level).map_err(|_| ConfigError::Invalid {
            key: "log_level".to_string(),
            message: format!("unknown level {:?}", self.log_level),
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("expected a boolean, got {:?}", raw),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = QueryConfig::default();
        assert!(config.fetch_join_collection);
        assert_eq!(config.use_output_walkers, None);
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            QueryConfig::from_json_str(r#"{ "use_output_walkers": false, "log_level": "debug" }"#)
                .unwrap();
        assert_eq!(config.use_output_walkers, Some(false));
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let err = QueryConfig::from_json_str(r#"{ "items_per_page": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "items_per_page"));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(QueryConfig::from_json_str(r#"{ "log_level": "loud" }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "fetch_join_collection": false }}"#).unwrap();

        let config = QueryConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(!config.fetch_join_collection);
    }

    #[test]
    fn test_missing_file() {
        let err = QueryConfig::from_file("/nonexistent/query_object.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FETCH_JOIN_COLLECTION", "off"),
            ("USE_OUTPUT_WALKERS", "true"),
            ("ITEMS_PER_PAGE", "50"),
        ]
        .into_iter()
        .collect();

        let config = QueryConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(!config.fetch_join_collection);
        assert_eq!(config.use_output_walkers, Some(true));
        assert_eq!(config.items_per_page, 50);
    }

    #[test]
    fn test_empty_output_walkers_override_unsets() {
        let config = QueryConfig {
            use_output_walkers: Some(true),
            ..QueryConfig::default()
        }
        .with_overrides(|key| (key == "USE_OUTPUT_WALKERS").then(String::new))
        .unwrap();
        assert_eq!(config.use_output_walkers, None);
    }

    #[test]
    fn test_env_overrides() {
        // the only test touching QUERY_OBJECT_* variables
        std::env::set_var(format!("{}ITEMS_PER_PAGE", ENV_PREFIX), "25");
        let config = QueryConfig::default().with_env_overrides();
        std::env::remove_var(format!("{}ITEMS_PER_PAGE", ENV_PREFIX));

        let config = config.unwrap();
        assert_eq!(config.items_per_page, 25);
        assert!(config.fetch_join_collection);
    }

    #[test]
    fn test_bad_override() {
        let result = QueryConfig::default()
            .with_overrides(|key| (key == "ITEMS_PER_PAGE").then(|| "many".to_string()));
        assert!(result.is_err());
    }
}
