//! In-memory database
//!
//! The reference engine the query layer runs against:
//! - `schema`: table catalog, validation, and the execution counter
//! - `executor`: the [`crate::query::QueryEngine`] implementation
//! - `repository`: a [`crate::query::Repository`] for one table
//! - `storage`: JSON persistence
//!
//! # Example
//!
//! ```rust,no_run
//! use query_object::database::{DatabaseStorage, EntityRepository};
//!
//! let db = DatabaseStorage::new().load("blog.json")?;
//! let articles = EntityRepository::new(&db, "articles")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod executor;
pub mod repository;
pub mod schema;
pub mod storage;

// Re-export main types for convenience
pub use repository::EntityRepository;
pub use schema::{Database, Schema};
pub use storage::DatabaseStorage;
