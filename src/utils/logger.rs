//! Logging setup
//!
//! The crate logs through the `log` facade; [`Logger`] installs
//! `env_logger` as the backend. Initialization is idempotent, so tests and
//! applications may call it more than once.
//!
//! # Example
//!
//! ```rust
//! use query_object::config::QueryConfig;
//! use query_object::utils::Logger;
//!
//! Logger::init_from_config(&QueryConfig::default())?;
//! log::info!("query layer ready");
//! # Ok::<(), query_object::error::ConfigError>(())
//! ```

use crate::config::QueryConfig;
use crate::error::ConfigError;
use log::LevelFilter;

/// Logger initialization
pub struct Logger;

impl Logger {
    /// Initialize at `info`, letting `RUST_LOG` refine it
    pub fn init() {
        Self::init_with_level(LevelFilter::Info);
    }

    /// Initialize with a base level; `RUST_LOG` directives still apply on top
    pub fn init_with_level(level: LevelFilter) {
        let installed = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .is_ok();
        if installed {
            log::debug!("Logger initialized at {}", level);
        }
    }

    /// Initialize from the configured `log_level`
    pub fn init_from_config(config: &QueryConfig) -> Result<(), ConfigError> {
        Self::init_with_level(config.log_level_filter()?);
        Ok(())
    }
}
