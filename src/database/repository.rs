//! Table-backed repository
//!
//! [`EntityRepository`] serves query builders for one table of a
//! [`Database`] and executes them on that database.

use crate::database::schema::Database;
use crate::error::SchemaError;
use crate::query::builder::{Query, QueryBuilder};
use crate::query::engine::{QueryEngine, Repository};

/// Repository of one table
#[derive(Debug, Clone, Copy)]
pub struct EntityRepository<'db> {
    database: &'db Database,
    table: &'db str,
}

impl<'db> EntityRepository<'db> {
    /// Repository of `table`
    ///
    /// # Returns
    /// `Err(SchemaError::UnknownTable)` if the database has no such table
    pub fn new(database: &'db Database, table: &str) -> Result<Self, SchemaError> {
        let table = database
            .get_table(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))?;

        Ok(Self {
            database,
            table: &table.name,
        })
    }

    pub fn table_name(&self) -> &str {
        self.table
    }

    pub fn database(&self) -> &'db Database {
        self.database
    }

    /// Native query against the same database
    pub fn create_native_query(&self, sql: &str) -> Query {
        Query::native(sql)
    }
}

impl Repository for EntityRepository<'_> {
    fn create_query_builder(&self, alias: &str) -> QueryBuilder {
        QueryBuilder::new(self.table, alias)
    }

    fn engine(&self) -> &dyn QueryEngine {
        self.database
    }
}
