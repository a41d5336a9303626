//! Error types
//!
//! The query layer distinguishes three failure classes:
//! - [`InvalidState`]: the caller broke a usage contract (mutating a frozen
//!   result set, a single-row query returning several rows, asking for an
//!   explicit count query that was never defined)
//! - [`QueryError::Execution`]: the engine failed; the underlying cause and the
//!   last built query travel with the error
//! - [`QueryError::InvalidArgument`]: a request the query cannot satisfy, such
//!   as paginating a native query
//!
//! Engine-side failures are described by [`EngineError`]. Schema, storage and
//! configuration have their own small error enums.

use crate::query::builder::Query;
use thiserror::Error;

/// Usage-contract violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidState {
    /// A mutator was called after the result set was fetched
    #[error("Cannot modify result set, that was already fetched from storage")]
    Frozen,

    /// Paging was changed after the rows were materialized
    #[error("Cannot change paging of result set, its rows were already materialized")]
    Materialized,

    /// A single-result query produced several rows
    #[error("Single result query returned more than one row, limit the query to one result")]
    NonUniqueResult,

    /// The query type does not define an explicit count query
    #[error("Method do_create_count_query is not defined")]
    CountQueryNotDefined,
}

/// Errors raised by the query layer
#[derive(Error, Debug)]
pub enum QueryError {
    /// Usage-contract violation
    #[error(transparent)]
    InvalidState(#[from] InvalidState),

    /// The engine failed while executing a query
    #[error("{}", execution_message(.source, .query.as_deref()))]
    Execution {
        /// Underlying engine failure
        #[source]
        source: EngineError,

        /// Query being executed, for diagnostics
        query: Option<Box<Query>>,
    },

    /// Request the query cannot satisfy
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

fn execution_message(source: &EngineError, query: Option<&Query>) -> String {
    match query {
        Some(query) => format!("[{}] {}", query.dql(), source),
        None => source.to_string(),
    }
}

impl QueryError {
    /// Wrap an engine failure together with the query that caused it
    pub fn execution(source: EngineError, query: Option<&Query>) -> Self {
        QueryError::Execution {
            source,
            query: query.cloned().map(Box::new),
        }
    }

    /// Whether this is the "count query not defined" condition
    pub fn is_not_implemented(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidState(InvalidState::CountQueryNotDefined)
        )
    }

    /// The query attached to an execution failure
    pub fn query(&self) -> Option<&Query> {
        match self {
            QueryError::Execution { query, .. } => query.as_deref(),
            _ => None,
        }
    }
}

/// Errors raised by a query engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Query text could not be parsed
    #[error("Failed to parse query: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    /// Table is not part of the schema
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Column reference could not be resolved
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Bound parameter missing at execution time
    #[error("Missing value for parameter :{0}")]
    MissingParameter(String),

    /// Construct outside the supported query subset
    #[error("Unsupported query construct: {0}")]
    Unsupported(String),

    /// Scalar result requested but several rows or columns came back
    #[error("Query returned a non-unique result")]
    NonUniqueResult,

    /// Scalar result requested but nothing came back
    #[error("Query returned no result")]
    NoResult,

    /// Value of an unexpected type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
}

/// Schema validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table {0} already exists")]
    DuplicateTable(String),

    #[error("Table {0} has no columns")]
    NoColumns(String),

    #[error("Table {table} has duplicate column: {column}")]
    DuplicateColumn { table: String, column: String },

    #[error("Table {table} row {row} has {values} values but schema has {columns} columns")]
    RowWidth {
        table: String,
        row: usize,
        values: usize,
        columns: usize,
    },

    #[error("Table {0} not found")]
    UnknownTable(String),
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize database: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {key}: {message}")]
    Invalid { key: String, message: String },
}
