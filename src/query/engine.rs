//! Collaborator contracts
//!
//! The query layer never talks to storage directly. It goes through a
//! [`QueryEngine`], which executes finalized queries, and a [`Repository`],
//! which hands out query builders for one entity type and names the engine
//! that serves them. [`crate::database::Database`] is the in-memory engine
//! shipped with the crate.

use crate::error::EngineError;
use crate::query::builder::{Query, QueryBuilder};
use crate::query::pagination::PaginationOptions;
use crate::types::{Record, Value};

/// Executes finalized queries
pub trait QueryEngine {
    /// Execute honoring offset, limit and hydration mode
    fn execute(&self, query: &Query) -> Result<Vec<Record>, EngineError>;

    /// Execute and return exactly one scalar value
    fn execute_scalar(&self, query: &Query) -> Result<Value, EngineError>;

    /// Count the rows a query matches, ignoring its offset and limit
    ///
    /// With `fetch_join_collection` the count is over distinct root
    /// entities, so joins that fan out into collections do not over-count.
    fn paginated_count(
        &self,
        query: &Query,
        options: &PaginationOptions,
    ) -> Result<u64, EngineError>;

    /// Execute one page of a query
    ///
    /// With `fetch_join_collection` the offset and limit select root entities
    /// rather than joined rows, so every returned entity carries its complete
    /// fetch-joined collections.
    fn paginated_iterate(
        &self,
        query: &Query,
        options: &PaginationOptions,
    ) -> Result<Vec<Record>, EngineError>;
}

/// Source of query builders for one entity type
pub trait Repository {
    /// New builder selecting the repository's entity under `alias`
    fn create_query_builder(&self, alias: &str) -> QueryBuilder;

    /// Engine executing this repository's queries
    fn engine(&self) -> &dyn QueryEngine;
}
