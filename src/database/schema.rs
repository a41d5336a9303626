//! Database schema management
//!
//! This module provides the table catalog of the in-memory engine together
//! with the validation applied before a database is saved or after it is
//! loaded.
//!
//! # Example
//!
//! ```rust
//! use query_object::database::{Database, Schema};
//! use query_object::types::{Column, DataType, Table};
//!
//! let mut schema = Schema::new("blog".to_string());
//! schema.add_table(
//!     Table::new(
//!         "articles".to_string(),
//!         vec![
//!             Column::new("id".to_string(), DataType::BigInt),
//!             Column::new("title".to_string(), DataType::Varchar(255)),
//!         ],
//!     )
//!     .with_primary_key("id"),
//! )?;
//!
//! let mut db = Database::new(schema);
//! db.insert("articles", vec![1i64.into(), "Hello".into()])?;
//! assert_eq!(db.get_table("articles").map(|t| t.num_rows()), Some(1));
//! # Ok::<(), query_object::error::SchemaError>(())
//! ```

use crate::error::SchemaError;
use crate::types::{Row, Table, Value};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

/// Database schema
///
/// Represents the schema of a database, including all table definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Database name
    pub name: String,

    /// Table definitions (name -> table)
    pub tables: HashMap<String, Table>,
}

impl Schema {
    /// Create a new database schema
    pub fn new(name: String) -> Self {
        Self {
            name,
            tables: HashMap::new(),
        }
    }

    /// Add a table to the schema
    ///
    /// # Returns
    /// `Err(SchemaError::DuplicateTable)` if the table already exists
    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        if self.tables.contains_key(&table.name) {
            return Err(SchemaError::DuplicateTable(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Validate the schema
    ///
    /// Checks that all tables have distinct columns and that every row
    /// matches its table's width.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (name, table) in &self.tables {
            if table.columns.is_empty() {
                return Err(SchemaError::NoColumns(name.clone()));
            }

            let mut column_names = HashSet::new();
            for column in &table.columns {
                if !column_names.insert(&column.name) {
                    return Err(SchemaError::DuplicateColumn {
                        table: name.clone(),
                        column: column.name.clone(),
                    });
                }
            }

            for (row_idx, row) in table.rows.iter().enumerate() {
                if row.values.len() != table.columns.len() {
                    return Err(SchemaError::RowWidth {
                        table: name.clone(),
                        row: row_idx,
                        values: row.values.len(),
                        columns: table.columns.len(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Get all table names, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Database
///
/// The in-memory engine: a schema with its rows, plus a counter of the
/// queries executed against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// Database schema
    pub schema: Schema,

    #[serde(skip)]
    executions: Cell<u64>,
}

impl Database {
    /// Create a new database
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            executions: Cell::new(0),
        }
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.schema.get_table(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.schema.get_table_mut(name)
    }

    /// Append a row to a table
    pub fn insert(&mut self, table: &str, values: Vec<Value>) -> Result<(), SchemaError> {
        let target = self
            .schema
            .get_table_mut(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))?;

        if values.len() != target.columns.len() {
            return Err(SchemaError::RowWidth {
                table: table.to_string(),
                row: target.rows.len(),
                values: values.len(),
                columns: target.columns.len(),
            });
        }

        target.rows.push(Row::new(values));
        Ok(())
    }

    /// Validate the database
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.schema.validate()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.schema.table_names()
    }

    /// Number of queries executed so far
    pub fn execution_count(&self) -> u64 {
        self.executions.get()
    }

    pub(crate) fn record_execution(&self) {
        self.executions.set(self.executions.get() + 1);
    }
}
