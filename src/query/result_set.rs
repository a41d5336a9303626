//! Result sets
//!
//! A [`ResultSet`] wraps one concrete query built by a query object. It can
//! be sorted and paged until it is first read; counting or iterating runs
//! the query once, caches the outcome and freezes the result set.
//!
//! ```text
//! Unfrozen --get_total_count() / get_iterator()--> Frozen
//! ```
//!
//! Every mutator except [`ResultSet::apply_paging`] fails on a frozen result
//! set. Paging stays open after the total count is known, because a
//! paginator reads the count first and applies its window afterwards; it is
//! closed only once the rows themselves are materialized.
//!
//! Result set handles share their state through `Rc`, so they (and the query
//! object that created them) stay on the thread that created them.
//!
//! # Example
//!
//! ```rust,ignore
//! let articles = query.fetch(&repository)?;
//! articles.apply_sorting(["a.title"])?;
//!
//! let mut paginator = Paginator::new(10);
//! paginator.set_page(2);
//! articles.apply_paginator(&mut paginator, None)?;
//!
//! for article in articles.get_iterator(HydrationMode::Object)? {
//!     println!("{:?}", article.get("title"));
//! }
//! ```

use crate::config::QueryConfig;
use crate::error::{InvalidState, QueryError};
use crate::query::builder::Query;
use crate::query::engine::Repository;
use crate::query::object::QueryObject;
use crate::query::pagination::{PaginatedQuery, Paginator};
use crate::query::sorting::{self, Sorting};
use crate::types::{HydrationMode, Record};
use log::debug;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// State shared by every handle of one result set
#[derive(Debug)]
pub(crate) struct ResultSetState {
    pub(crate) query: Query,
    fetch_join_collection: bool,
    use_output_walkers: Option<bool>,
    total_count: Option<u64>,
    iterator: Option<Rc<[Record]>>,
    frozen: bool,
}

impl ResultSetState {
    pub(crate) fn new(query: Query, config: &QueryConfig) -> Self {
        Self {
            query,
            fetch_join_collection: config.fetch_join_collection,
            use_output_walkers: config.use_output_walkers,
            total_count: None,
            iterator: None,
            frozen: false,
        }
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.iterator.is_some()
    }
}

pub(crate) type SharedState = Rc<RefCell<ResultSetState>>;

/// Cursor over materialized rows
///
/// Every call to [`ResultSet::get_iterator`] returns a fresh cursor over the
/// same cached rows.
#[derive(Debug, Clone)]
pub struct ResultIterator {
    records: Rc<[Record]>,
    position: usize,
}

impl ResultIterator {
    fn new(records: Rc<[Record]>) -> Self {
        Self {
            records,
            position: 0,
        }
    }

    /// All rows, regardless of the cursor position
    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }
}

impl Iterator for ResultIterator {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let record = self.records.get(self.position)?.clone();
        self.position += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ResultIterator {}

/// Lazy, freezing view of one query's results
///
/// Holds non-owning borrows of the query object and repository it came
/// from; the query object is consulted again when the total count is needed.
pub struct ResultSet<'a, Q, R: ?Sized> {
    state: SharedState,
    query_object: &'a Q,
    repository: &'a R,
}

impl<'a, Q, R> ResultSet<'a, Q, R>
where
    Q: QueryObject<R>,
    R: Repository + ?Sized,
{
    pub(crate) fn new(state: SharedState, query_object: &'a Q, repository: &'a R) -> Self {
        Self {
            state,
            query_object,
            repository,
        }
    }

    /// Whether two handles refer to the same result set
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.state, &other.state)
    }

    /// Current query, including applied sorting and paging
    pub fn query(&self) -> Query {
        self.state.borrow().query.clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.state.borrow().frozen
    }

    pub fn fetch_join_collection(&self) -> bool {
        self.state.borrow().fetch_join_collection
    }

    pub fn use_output_walkers(&self) -> Option<bool> {
        self.state.borrow().use_output_walkers
    }

    fn updating(&self) -> Result<RefMut<'_, ResultSetState>, QueryError> {
        let state = self.state.borrow_mut();
        if state.frozen {
            return Err(InvalidState::Frozen.into());
        }
        Ok(state)
    }

    pub fn set_fetch_join_collection(&self, fetch_join_collection: bool) -> Result<(), QueryError> {
        let mut state = self.updating()?;
        state.fetch_join_collection = fetch_join_collection;
        state.iterator = None;
        Ok(())
    }

    pub fn set_use_output_walkers(&self, use_output_walkers: Option<bool>) -> Result<(), QueryError> {
        let mut state = self.updating()?;
        state.use_output_walkers = use_output_walkers;
        state.iterator = None;
        Ok(())
    }

    /// Remove the ORDER BY clause that is not inside a sub-query
    pub fn clear_sorting(&self) -> Result<(), QueryError> {
        let mut state = self.updating()?;
        sorting::clear_sorting(&mut state.query)?;
        state.iterator = None;
        Ok(())
    }

    /// Append sorting directives to the query's ORDER BY
    ///
    /// Accepts directive strings (`["a.title", "a.id DESC"]`) or column →
    /// direction pairs (`[("a.title", "DESC")]`). The cached total count is
    /// unaffected since sorting cannot change it.
    pub fn apply_sorting(&self, sorting: impl Into<Sorting>) -> Result<(), QueryError> {
        let mut state = self.updating()?;
        let directives = sorting.into().normalize()?;
        sorting::apply_sorting(&mut state.query, &directives)?;
        state.iterator = None;
        Ok(())
    }

    /// Normalized directives of the current outermost ORDER BY
    pub fn sorting(&self) -> Result<Vec<String>, QueryError> {
        sorting::current_sorting(&self.state.borrow().query)
    }

    /// Set offset and limit
    ///
    /// Nothing happens when both already have the requested values (an
    /// offset of `None` equals `Some(0)`). Changing them after the rows were
    /// materialized fails with [`InvalidState::Materialized`].
    pub fn apply_paging(&self, offset: Option<usize>, limit: Option<usize>) -> Result<(), QueryError> {
        let mut state = self.state.borrow_mut();
        if !state.query.is_structured() {
            return Ok(());
        }

        let unchanged = state.query.first_result().unwrap_or(0) == offset.unwrap_or(0)
            && state.query.max_results() == limit;
        if unchanged {
            return Ok(());
        }
        if state.is_materialized() {
            return Err(InvalidState::Materialized.into());
        }

        state
            .query
            .set_first_result(offset)
            .set_max_results(limit);
        state.iterator = None;
        Ok(())
    }

    /// Feed the total count into `paginator` and apply its window
    pub fn apply_paginator(
        &self,
        paginator: &mut Paginator,
        items_per_page: Option<usize>,
    ) -> Result<(), QueryError> {
        if let Some(items_per_page) = items_per_page {
            paginator.set_items_per_page(items_per_page);
        }

        paginator.set_item_count(self.get_total_count()?);
        self.apply_paging(Some(paginator.offset()), Some(paginator.length()))
    }

    /// Whether the current offset is past the last matching row
    pub fn is_empty(&self) -> Result<bool, QueryError> {
        let count = self.get_total_count()?;
        let offset = self.state.borrow().query.first_result().unwrap_or(0);
        Ok(count <= offset as u64)
    }

    fn create_paginated_query(&self) -> Result<PaginatedQuery, QueryError> {
        let state = self.state.borrow();
        let mut paginated = PaginatedQuery::new(&state.query, state.fetch_join_collection)?;
        paginated.set_use_output_walkers(state.use_output_walkers);
        Ok(paginated)
    }

    /// Number of rows matching the query, ignoring offset and limit
    ///
    /// Computed once through the query object's count strategy; freezes the
    /// result set.
    pub fn get_total_count(&self) -> Result<u64, QueryError> {
        if let Some(total_count) = self.state.borrow().total_count {
            return Ok(total_count);
        }

        let paginated = self.create_paginated_query()?;
        let total_count = self
            .query_object
            .count(self.repository, Some(self), Some(&paginated))?;

        let mut state = self.state.borrow_mut();
        state.total_count = Some(total_count);
        state.frozen = true;
        debug!("Counted {} rows of [{}], result set frozen", total_count, state.query.dql());
        Ok(total_count)
    }

    /// Materialize the rows once and return a cursor over them; freezes the result set
    ///
    /// `mode` only matters for the first call.
    pub fn get_iterator(&self, mode: HydrationMode) -> Result<ResultIterator, QueryError> {
        if let Some(records) = &self.state.borrow().iterator {
            return Ok(ResultIterator::new(Rc::clone(records)));
        }

        let records = {
            let mut state = self.state.borrow_mut();
            state.query.set_hydration_mode(mode);

            let engine = self.repository.engine();
            let result = if state.fetch_join_collection
                && state.query.is_structured()
                && state.query.is_paged()
            {
                let mut paginated = PaginatedQuery::new(&state.query, true)?;
                paginated.set_use_output_walkers(state.use_output_walkers);
                paginated.iterate(engine)
            } else {
                state.query.execute(engine)
            };

            let records: Rc<[Record]> = result
                .map_err(|e| QueryError::execution(e, Some(&state.query)))?
                .into();
            state.iterator = Some(Rc::clone(&records));
            state.frozen = true;
            debug!(
                "Materialized {} rows of [{}], result set frozen",
                records.len(),
                state.query.dql()
            );
            records
        };

        self.query_object.state().notify_fetched(&records);
        Ok(ResultIterator::new(records))
    }

    /// Materialized rows as an independent vector
    pub fn to_array(&self, mode: HydrationMode) -> Result<Vec<Record>, QueryError> {
        Ok(self.get_iterator(mode)?.as_slice().to_vec())
    }

    /// Number of materialized rows (at most the page size when paged)
    pub fn count(&self) -> Result<usize, QueryError> {
        Ok(self.get_iterator(HydrationMode::Object)?.as_slice().len())
    }
}

impl<Q, R: ?Sized> Clone for ResultSet<'_, Q, R> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            query_object: self.query_object,
            repository: self.repository,
        }
    }
}

impl<Q, R: ?Sized> fmt::Debug for ResultSet<'_, Q, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("ResultSet")
                .field("query", &state.query.dql())
                .field("fetch_join_collection", &state.fetch_join_collection)
                .field("use_output_walkers", &state.use_output_walkers)
                .field("total_count", &state.total_count)
                .field("frozen", &state.frozen)
                .finish(),
            Err(_) => f.debug_struct("ResultSet").finish_non_exhaustive(),
        }
    }
}
