//! query_object: reusable query objects with lazy, freezing result sets
//!
//! A query object describes one parameterizable query over a repository.
//! Fetching it yields a [`query::ResultSet`] that can be sorted and paged
//! until it is first read; counting or iterating then executes exactly once
//! and freezes it. Building the same query twice reuses the previous result
//! set.
//!
//! The crate ships an in-memory engine ([`database::Database`]) that
//! evaluates the generated SQL subset, so query objects can be exercised
//! without an external database.
//!
//! # Example
//!
//! ```rust,ignore
//! use query_object::prelude::*;
//!
//! struct EnabledArticles {
//!     state: QueryObjectState,
//! }
//!
//! impl<R: Repository + ?Sized> QueryObject<R> for EnabledArticles {
//!     fn state(&self) -> &QueryObjectState {
//!         &self.state
//!     }
//!
//!     fn do_create_query(&self, repository: &R) -> Result<Query, QueryError> {
//!         let mut qb = repository.create_query_builder("a");
//!         qb.and_where("a.enabled = :enabled").set_parameter("enabled", true);
//!         Ok(qb.get_query())
//!     }
//! }
//!
//! let repository = EntityRepository::new(&database, "articles")?;
//! let query = EnabledArticles { state: QueryObjectState::new() };
//!
//! let articles = query.fetch(&repository)?;
//! println!("{} enabled articles", articles.get_total_count()?);
//! ```

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod database;
pub mod error;
pub mod query;
pub mod types;
pub mod utils;

pub use config::QueryConfig;
pub use error::{EngineError, InvalidState, QueryError};
pub use types::{Entity, HydrationMode, Record, Value};

/// Everything needed to write and run a query object
pub mod prelude {
    pub use crate::config::QueryConfig;
    pub use crate::database::{Database, EntityRepository};
    pub use crate::error::{InvalidState, QueryError};
    pub use crate::query::{
        Constraint, Constraints, Direction, Fetched, JoinKind, Paginator, Query, QueryBuilder,
        QueryEngine, QueryObject, QueryObjectState, Repository, ResultSet, Sorting,
    };
    pub use crate::types::{HydrationMode, Record, Value};
}
