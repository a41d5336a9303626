//! Utilities module
//!
//! - `logger`: `env_logger` setup for the `log` facade

pub mod logger;

// Re-export main types for convenience
pub use logger::Logger;
