//! Database storage layer
//!
//! Persists the in-memory database as JSON and loads it back, validating
//! the schema on both sides.
//!
//! # Example
//!
//! ```rust,no_run
//! use query_object::database::{Database, DatabaseStorage, Schema};
//!
//! let db = Database::new(Schema::new("blog".to_string()));
//!
//! let storage = DatabaseStorage::new();
//! storage.save(&db, "blog.json")?;
//! let loaded = storage.load("blog.json")?;
//! # Ok::<(), query_object::error::StorageError>(())
//! ```

use crate::database::schema::Database;
use crate::error::StorageError;
use log::debug;
use std::fs;
use std::path::Path;

/// Database storage
#[derive(Debug, Clone, Default)]
pub struct DatabaseStorage;

impl DatabaseStorage {
    pub fn new() -> Self {
        Self
    }

    /// Save a database to a JSON file
    pub fn save(&self, database: &Database, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        database.validate()?;

        let json = serde_json::to_string_pretty(database)?;
        fs::write(path, json).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?;

        debug!(
            "Saved database {} ({} tables) to {}",
            database.schema.name,
            database.schema.tables.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a database from a JSON file
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Database, StorageError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let database: Database = serde_json::from_str(&contents)?;
        database.validate()?;

        debug!("Loaded database {} from {}", database.schema.name, path.display());
        Ok(database)
    }
}
