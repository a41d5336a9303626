//! Query layer
//!
//! Reusable query objects on top of a relational query engine.
//!
//! The query module consists of:
//! - `builder`: query builder and finalized queries
//! - `engine`: the engine and repository contracts
//! - `object`: query objects and their one-entry query cache
//! - `result_set`: lazy, freezing result sets
//! - `sorting`: ORDER BY rewriting
//! - `pagination`: paginating count and page windows
//! - `constraint`: replayable query modifications
//! - `parser`: SQL parsing into AST
//!
//! # Workflow
//!
//! 1. **Describe**: a query object records its constraints
//! 2. **Build**: `fetch` builds the query, reusing the previous result set if
//!    nothing changed
//! 3. **Shape**: the caller sorts and pages the result set
//! 4. **Read**: counting or iterating executes once and freezes it
//!
//! # Example
//!
//! ```rust,ignore
//! use query_object::query::{Paginator, QueryObject};
//! use query_object::types::HydrationMode;
//!
//! let articles = query.fetch(&repository)?;
//! articles.apply_sorting(["a.title DESC"])?;
//!
//! let mut paginator = Paginator::new(10);
//! articles.apply_paginator(&mut paginator, None)?;
//! let page = articles.to_array(HydrationMode::Object)?;
//! ```

pub mod builder;
pub mod constraint;
pub mod engine;
pub mod object;
pub mod pagination;
pub mod parser;
pub mod result_set;
pub mod sorting;

// Re-export main types for convenience
pub use builder::{Direction, JoinKind, Query, QueryBuilder, QueryKind};
pub use constraint::{Constraint, Constraints};
pub use engine::{QueryEngine, Repository};
pub use object::{Fetched, PostFetchListener, QueryObject, QueryObjectState};
pub use pagination::{PaginatedQuery, PaginationOptions, Paginator};
pub use parser::QueryParser;
pub use result_set::{ResultIterator, ResultSet};
pub use sorting::Sorting;
