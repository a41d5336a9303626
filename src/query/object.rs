//! Query objects
//!
//! A query object describes one reusable query. Implementors build the
//! query from a repository in [`QueryObject::do_create_query`] and may
//! provide a dedicated count query; everything else (fetching, counting,
//! fetching a single row, and the one-entry query cache) is provided.
//!
//! Building the same query twice in a row reuses the previous result set,
//! so a query object hands out the same rows until its constraints change.
//!
//! # Example
//!
//! ```rust,ignore
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
//! let query = EnabledArticles { state: QueryObjectState::new() };
//! let total = query.count(&repository, None, None)?;
//! ```

use crate::config::QueryConfig;
use crate::error::{EngineError, InvalidState, QueryError};
use crate::query::builder::Query;
use crate::query::engine::Repository;
use crate::query::pagination::PaginatedQuery;
use crate::query::result_set::{ResultSet, ResultSetState, SharedState};
use crate::types::{HydrationMode, Record, Value};
use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback run with the rows of every fetch
pub type PostFetchListener = Box<dyn Fn(&[Record])>;

/// Bookkeeping every query object carries
pub struct QueryObjectState {
    config: QueryConfig,
    last_result: RefCell<Option<SharedState>>,
    post_fetch: Vec<PostFetchListener>,
}

impl QueryObjectState {
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    /// State whose result sets start from `config`'s pagination defaults
    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            config,
            last_result: RefCell::new(None),
            post_fetch: Vec::new(),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Register a listener, run after `fetch_one` and after a result set materializes
    pub fn on_post_fetch<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&[Record]) + 'static,
    {
        self.post_fetch.push(Box::new(listener));
        self
    }

    pub(crate) fn notify_fetched(&self, records: &[Record]) {
        for listener in &self.post_fetch {
            listener(records);
        }
    }

    /// Query of the most recent result set, including its sorting and paging
    pub fn last_query(&self) -> Option<Query> {
        self.last_result
            .borrow()
            .as_ref()
            .map(|state| state.borrow().query.clone())
    }
}

impl Default for QueryObjectState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryObjectState")
            .field("config", &self.config)
            .field("last_query", &self.last_query().map(|q| q.dql().to_string()))
            .field("post_fetch", &self.post_fetch.len())
            .finish()
    }
}

/// Outcome of [`QueryObject::fetch_hydrated`]
pub enum Fetched<'a, Q, R: ?Sized> {
    /// Lazy result set (object hydration)
    ResultSet(ResultSet<'a, Q, R>),

    /// Eagerly executed rows (array or scalar hydration)
    Rows(Vec<Record>),
}

impl<'a, Q, R> Fetched<'a, Q, R>
where
    Q: QueryObject<R>,
    R: Repository + ?Sized,
{
    /// Rows, materializing the result set if needed
    pub fn into_records(self) -> Result<Vec<Record>, QueryError> {
        match self {
            Fetched::ResultSet(result_set) => result_set.to_array(HydrationMode::Object),
            Fetched::Rows(rows) => Ok(rows),
        }
    }

    pub fn into_result_set(self) -> Option<ResultSet<'a, Q, R>> {
        match self {
            Fetched::ResultSet(result_set) => Some(result_set),
            Fetched::Rows(_) => None,
        }
    }
}

impl<Q, R: ?Sized> fmt::Debug for Fetched<'_, Q, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fetched::ResultSet(result_set) => f.debug_tuple("ResultSet").field(result_set).finish(),
            Fetched::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
        }
    }
}

/// Reusable query description
pub trait QueryObject<R: Repository + ?Sized> {
    /// Cache and listener state
    fn state(&self) -> &QueryObjectState;

    /// Build the query; must render identically for identical constraints
    fn do_create_query(&self, repository: &R) -> Result<Query, QueryError>;

    /// Build a dedicated count query returning one scalar
    ///
    /// The default reports [`InvalidState::CountQueryNotDefined`], which makes
    /// [`QueryObject::count`] fall back to the paginating count.
    fn do_create_count_query(&self, _repository: &R) -> Result<Query, QueryError> {
        Err(InvalidState::CountQueryNotDefined.into())
    }

    /// Lazy result set for the current constraints
    ///
    /// Reuses the previous result set when the query did not change. Offset
    /// and limit are reset unless that result set was already materialized.
    fn fetch<'a>(&'a self, repository: &'a R) -> Result<ResultSet<'a, Self, R>, QueryError>
    where
        Self: Sized,
    {
        let shared = get_query(self, repository)?;
        {
            let mut state = shared.borrow_mut();
            if !state.is_materialized() {
                state.query.set_first_result(None).set_max_results(None);
            }
        }
        Ok(ResultSet::new(shared, self, repository))
    }

    /// Fetch with an explicit hydration mode
    ///
    /// Object hydration returns the lazy result set; other modes execute an
    /// unpaged copy of the query right away.
    fn fetch_hydrated<'a>(
        &'a self,
        repository: &'a R,
        mode: HydrationMode,
    ) -> Result<Fetched<'a, Self, R>, QueryError>
    where
        Self: Sized,
    {
        if mode == HydrationMode::Object {
            return self.fetch(repository).map(Fetched::ResultSet);
        }

        let shared = get_query(self, repository)?;
        let mut query = shared.borrow().query.without_paging();
        query.set_hydration_mode(mode);
        let rows = query
            .execute(repository.engine())
            .map_err(|e| QueryError::execution(e, Some(&query)))?;
        Ok(Fetched::Rows(rows))
    }

    /// At most one row
    ///
    /// Runs a copy of the query limited to one row; the cached result set is
    /// left untouched. Post-fetch listeners only see a row that was found.
    fn fetch_one(&self, repository: &R) -> Result<Option<Record>, QueryError> {
        let shared = get_query(self, repository)?;
        let mut query = shared.borrow().query.without_paging();
        query
            .set_max_results(Some(1))
            .set_hydration_mode(HydrationMode::Object);

        let rows = match query.execute(repository.engine()) {
            Ok(rows) => rows,
            Err(EngineError::NonUniqueResult) => return Err(InvalidState::NonUniqueResult.into()),
            Err(e) => return Err(QueryError::execution(e, Some(&query))),
        };
        match rows.len() {
            0 => Ok(None),
            1 => {
                self.state().notify_fetched(&rows);
                Ok(rows.into_iter().next())
            }
            _ => Err(InvalidState::NonUniqueResult.into()),
        }
    }

    /// Total number of matching rows
    ///
    /// Tries, in order: the dedicated count query, `paginated`, and a
    /// paginating count over the unpaged default query using `result_set`'s
    /// flags (or the configured defaults).
    fn count(
        &self,
        repository: &R,
        result_set: Option<&ResultSet<'_, Self, R>>,
        paginated: Option<&PaginatedQuery>,
    ) -> Result<u64, QueryError>
    where
        Self: Sized,
    {
        match self.do_create_count_query(repository) {
            Ok(count_query) => {
                debug!("Counting with dedicated query [{}]", count_query.dql());
                return count_query
                    .single_scalar_result(repository.engine())
                    .and_then(scalar_to_count)
                    .map_err(|e| QueryError::execution(e, Some(&count_query)));
            }
            Err(e) if e.is_not_implemented() => {}
            Err(e) => return Err(e),
        }

        if let Some(paginated) = paginated {
            return paginated
                .count(repository.engine())
                .map_err(|e| QueryError::execution(e, Some(paginated.query())));
        }

        let shared = get_query(self, repository)?;
        let query = shared.borrow().query.without_paging();
        let (fetch_join_collection, use_output_walkers) = match result_set {
            Some(result_set) => (
                result_set.fetch_join_collection(),
                result_set.use_output_walkers(),
            ),
            None => {
                let config = self.state().config();
                (config.fetch_join_collection, config.use_output_walkers)
            }
        };

        let mut paginated = PaginatedQuery::new(&query, fetch_join_collection)?;
        paginated.set_use_output_walkers(use_output_walkers);
        paginated
            .count(repository.engine())
            .map_err(|e| QueryError::execution(e, Some(&query)))
    }

    /// Query of the most recent result set
    fn last_query(&self) -> Option<Query> {
        self.state().last_query()
    }
}

fn scalar_to_count(value: Value) -> Result<u64, EngineError> {
    value
        .as_i64()
        .and_then(|count| u64::try_from(count).ok())
        .ok_or_else(|| EngineError::TypeMismatch(format!("count query returned {}", value)))
}

/// Build the query and reuse the cached result set when it is unchanged
fn get_query<Q, R>(query_object: &Q, repository: &R) -> Result<SharedState, QueryError>
where
    Q: QueryObject<R> + ?Sized,
    R: Repository + ?Sized,
{
    let candidate = query_object.do_create_query(repository)?;
    let object_state = query_object.state();
    let mut last_result = object_state.last_result.borrow_mut();

    if let Some(shared) = last_result.as_ref() {
        if shared.borrow().query.same_structure(&candidate) {
            debug!("Reusing result set of [{}]", candidate.dql());
            return Ok(Rc::clone(shared));
        }
    }

    debug!("Built query [{}]", candidate.dql());
    let shared = Rc::new(RefCell::new(ResultSetState::new(
        candidate,
        object_state.config(),
    )));
    *last_result = Some(Rc::clone(&shared));
    Ok(shared)
}
