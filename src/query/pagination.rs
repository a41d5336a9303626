//! Pagination
//!
//! - [`PaginatedQuery`]: the paginating-count capability. Wraps a structured
//!   query and counts or iterates it so that joins fanning out into
//!   collections neither over-count nor truncate collections.
//! - [`Paginator`]: a page window (page number, page size, item count) that
//!   result sets read their offset and limit from.

use crate::error::{EngineError, QueryError};
use crate::query::builder::Query;
use crate::query::engine::QueryEngine;
use crate::types::Record;

/// Strategy flags of the paginating capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Count and page distinct root entities instead of joined rows
    pub fetch_join_collection: bool,

    /// Wrap the count in an outer query; `None` lets the engine decide
    pub use_output_walkers: Option<bool>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            fetch_join_collection: true,
            use_output_walkers: None,
        }
    }
}

/// Paginating-count capability over a structured query
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedQuery {
    query: Query,
    options: PaginationOptions,
}

impl PaginatedQuery {
    /// Wrap a query
    ///
    /// # Returns
    /// `Err(QueryError::InvalidArgument)` for native queries
    pub fn new(query: &Query, fetch_join_collection: bool) -> Result<Self, QueryError> {
        if !query.is_structured() {
            return Err(QueryError::InvalidArgument(
                "Query object pagination only works with structured queries".to_string(),
            ));
        }

        Ok(Self {
            query: query.clone(),
            options: PaginationOptions {
                fetch_join_collection,
                use_output_walkers: None,
            },
        })
    }

    pub fn set_use_output_walkers(&mut self, use_output_walkers: Option<bool>) -> &mut Self {
        self.options.use_output_walkers = use_output_walkers;
        self
    }

    pub fn options(&self) -> &PaginationOptions {
        &self.options
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Number of matching root entities (or rows), ignoring paging
    pub fn count(&self, engine: &dyn QueryEngine) -> Result<u64, EngineError> {
        engine.paginated_count(&self.query, &self.options)
    }

    /// Rows of the wrapped query's current page
    pub fn iterate(&self, engine: &dyn QueryEngine) -> Result<Vec<Record>, EngineError> {
        engine.paginated_iterate(&self.query, &self.options)
    }
}

/// Page window
///
/// Pages are 1-based. Once the item count is known the current page is
/// clamped into `first_page()..=last_page()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    items_per_page: usize,
    item_count: Option<u64>,
}

impl Paginator {
    /// Paginator on page 1; a zero page size is treated as 1
    pub fn new(items_per_page: usize) -> Self {
        Self {
            page: 1,
            items_per_page: items_per_page.max(1),
            item_count: None,
        }
    }

    /// Paginator using the configured page size
    pub fn from_config(config: &crate::config::QueryConfig) -> Self {
        Self::new(config.items_per_page)
    }

    pub fn set_page(&mut self, page: usize) -> &mut Self {
        self.page = page;
        self
    }

    /// Current page, clamped to the known range
    pub fn page(&self) -> usize {
        self.page.clamp(self.first_page(), self.last_page().unwrap_or(usize::MAX))
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) -> &mut Self {
        self.items_per_page = items_per_page.max(1);
        self
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn set_item_count(&mut self, item_count: u64) -> &mut Self {
        self.item_count = Some(item_count);
        self
    }

    pub fn item_count(&self) -> Option<u64> {
        self.item_count
    }

    pub fn first_page(&self) -> usize {
        1
    }

    /// Last page, unknown until the item count is set
    pub fn last_page(&self) -> Option<usize> {
        self.page_count()
            .map(|count| self.first_page() + count.saturating_sub(1))
    }

    pub fn page_count(&self) -> Option<usize> {
        self.item_count
            .map(|count| (count as usize).div_ceil(self.items_per_page))
    }

    pub fn is_first(&self) -> bool {
        self.page() == self.first_page()
    }

    pub fn is_last(&self) -> bool {
        self.last_page().is_some_and(|last| self.page() == last)
    }

    /// Offset of the first item on the current page
    pub fn offset(&self) -> usize {
        (self.page() - self.first_page()) * self.items_per_page
    }

    /// Number of items on the current page
    pub fn length(&self) -> usize {
        match self.item_count {
            Some(count) => (count as usize)
                .saturating_sub(self.offset())
                .min(self.items_per_page),
            None => self.items_per_page,
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::from_config(&crate::config::QueryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_query_rejected() {
        let err = PaginatedQuery::new(&Query::native("SELECT * FROM articles"), true).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn test_paginated_query_options() {
        let mut paginated =
            PaginatedQuery::new(&Query::structured("SELECT a FROM articles a"), false).unwrap();
        paginated.set_use_output_walkers(Some(true));

        assert_eq!(
            paginated.options(),
            &PaginationOptions {
                fetch_join_collection: false,
                use_output_walkers: Some(true),
            }
        );
    }

    #[test]
    fn test_paginator_window() {
        let mut paginator = Paginator::new(10);
        paginator.set_item_count(25).set_page(3);

        assert_eq!(paginator.page_count(), Some(3));
        assert_eq!(paginator.offset(), 20);
        assert_eq!(paginator.length(), 5);
        assert!(paginator.is_last());
        assert!(!paginator.is_first());
    }

    #[test]
    fn test_paginator_clamps_page() {
        let mut paginator = Paginator::new(10);
        paginator.set_page(9).set_item_count(25);
        assert_eq!(paginator.page(), 3);

        paginator.set_page(0);
        assert_eq!(paginator.page(), 1);
    }

    #[test]
    fn test_paginator_without_item_count() {
        let mut paginator = Paginator::new(10);
        paginator.set_page(4);

        assert_eq!(paginator.offset(), 30);
        assert_eq!(paginator.length(), 10);
        assert_eq!(paginator.last_page(), None);
        assert!(!paginator.is_last());
    }

    #[test]
    fn test_paginator_empty() {
        let mut paginator = Paginator::new(10);
        paginator.set_item_count(0).set_page(2);

        assert_eq!(paginator.page(), 1);
        assert_eq!(paginator.offset(), 0);
        assert_eq!(paginator.length(), 0);
    }

    #[test]
    fn test_default_uses_config_page_size() {
        assert_eq!(Paginator::default().items_per_page(), 10);
    }
}
