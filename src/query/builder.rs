//! Query builder and finalized queries
//!
//! [`QueryBuilder`] accumulates select items, joins, predicates with bound
//! parameters, and ORDER BY directives, then renders them into a canonical
//! query text. [`Query`] is the finalized, executable form: its text and
//! parameters can be inspected and rewritten, and it carries the offset,
//! limit and hydration mode of the next execution.
//!
//! # Example
//!
//! ```rust
//! use query_object::query::{Direction, QueryBuilder};
//!
//! let mut qb = QueryBuilder::new("articles", "a");
//! qb.and_where("a.enabled = :enabled")
//!     .set_parameter("enabled", true)
//!     .add_order_by("a.title", Direction::Asc);
//!
//! assert_eq!(
//!     qb.dql(),
//!     "SELECT a FROM articles a WHERE a.enabled = :enabled ORDER BY a.title ASC"
//! );
//! ```

use crate::error::{EngineError, QueryError};
use crate::query::engine::QueryEngine;
use crate::types::{HydrationMode, Record, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(QueryError::InvalidArgument(format!(
                "Sort direction must be ASC or DESC, got {:?}",
                other
            ))),
        }
    }
}

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT OUTER JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct JoinClause {
    kind: JoinKind,
    table: String,
    alias: String,
    condition: String,
}

/// Mutable query-in-progress
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    select: Vec<String>,
    table: String,
    alias: String,
    joins: Vec<JoinClause>,
    conditions: Vec<String>,
    order_by: Vec<String>,
    parameters: BTreeMap<String, Value>,
    first_result: Option<usize>,
    max_results: Option<usize>,
}

impl QueryBuilder {
    /// Start a query selecting the root entity `alias` of `table`
    pub fn new(table: &str, alias: &str) -> Self {
        Self {
            select: vec![alias.to_string()],
            table: table.to_string(),
            alias: alias.to_string(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            parameters: BTreeMap::new(),
            first_result: None,
            max_results: None,
        }
    }

    /// Root alias
    pub fn root_alias(&self) -> &str {
        &self.alias
    }

    /// Replace the select list
    pub fn select(&mut self, expr: &str) -> &mut Self {
        self.select = vec![expr.to_string()];
        self
    }

    /// Append to the select list
    pub fn add_select(&mut self, expr: &str) -> &mut Self {
        if !self.select.iter().any(|s| s == expr) {
            self.select.push(expr.to_string());
        }
        self
    }

    /// Add an inner join
    pub fn inner_join(&mut self, table: &str, alias: &str, condition: &str) -> &mut Self {
        self.join(JoinKind::Inner, table, alias, condition)
    }

    /// Add a left outer join
    pub fn left_join(&mut self, table: &str, alias: &str, condition: &str) -> &mut Self {
        self.join(JoinKind::Left, table, alias, condition)
    }

    /// Add a join of the given kind
    pub fn join(&mut self, kind: JoinKind, table: &str, alias: &str, condition: &str) -> &mut Self {
        self.joins.push(JoinClause {
            kind,
            table: table.to_string(),
            alias: alias.to_string(),
            condition: condition.to_string(),
        });
        self
    }

    /// Add a predicate, combined with the existing ones by AND
    pub fn and_where(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// Bind a `:name` parameter
    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.parameters
            .insert(name.trim_start_matches(':').to_string(), value.into());
        self
    }

    /// Append an ORDER BY directive
    pub fn add_order_by(&mut self, sort: &str, direction: Direction) -> &mut Self {
        self.order_by.push(format!("{} {}", sort, direction));
        self
    }

    /// Replace all ORDER BY directives
    pub fn order_by(&mut self, sort: &str, direction: Direction) -> &mut Self {
        self.order_by.clear();
        self.add_order_by(sort, direction)
    }

    /// Offset of the first row
    pub fn set_first_result(&mut self, first_result: Option<usize>) -> &mut Self {
        self.first_result = first_result;
        self
    }

    /// Maximum number of rows
    pub fn set_max_results(&mut self, max_results: Option<usize>) -> &mut Self {
        self.max_results = max_results;
        self
    }

    /// Render the query text
    pub fn dql(&self) -> String {
        let mut dql = format!(
            "SELECT {} FROM {} {}",
            self.select.join(", "),
            self.table,
            self.alias
        );

        for join in &self.joins {
            dql.push_str(&format!(
                " {} {} {} ON {}",
                join.kind.keyword(),
                join.table,
                join.alias,
                join.condition
            ));
        }

        if !self.conditions.is_empty() {
            let conditions: Vec<String> = if self.conditions.len() == 1 {
                self.conditions.clone()
            } else {
                self.conditions
                    .iter()
                    .map(|c| {
                        if c.to_ascii_uppercase().contains(" OR ") {
                            format!("({})", c)
                        } else {
                            c.clone()
                        }
                    })
                    .collect()
            };
            dql.push_str(" WHERE ");
            dql.push_str(&conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            dql.push_str(" ORDER BY ");
            dql.push_str(&self.order_by.join(", "));
        }

        dql
    }

    /// Finalize into an executable query
    pub fn get_query(&self) -> Query {
        let mut query = Query::structured(&self.dql());
        query.parameters = self.parameters.clone();
        query.first_result = self.first_result;
        query.max_results = self.max_results;
        query
    }
}

impl From<QueryBuilder> for Query {
    fn from(qb: QueryBuilder) -> Self {
        qb.get_query()
    }
}

impl From<&QueryBuilder> for Query {
    fn from(qb: &QueryBuilder) -> Self {
        qb.get_query()
    }
}

/// Query flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Built through the query builder; can be rewritten and paginated
    Structured,

    /// Raw engine SQL; passed through untouched
    Native,
}

/// Finalized, executable query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: QueryKind,
    dql: String,
    parameters: BTreeMap<String, Value>,
    first_result: Option<usize>,
    max_results: Option<usize>,
    hydration_mode: HydrationMode,
}

impl Query {
    /// Structured query from its text
    pub fn structured(dql: &str) -> Self {
        Self::with_kind(QueryKind::Structured, dql)
    }

    /// Native query, excluded from rewriting and pagination
    pub fn native(sql: &str) -> Self {
        Self::with_kind(QueryKind::Native, sql)
    }

    fn with_kind(kind: QueryKind, dql: &str) -> Self {
        Self {
            kind,
            dql: dql.to_string(),
            parameters: BTreeMap::new(),
            first_result: None,
            max_results: None,
            hydration_mode: HydrationMode::default(),
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn is_structured(&self) -> bool {
        self.kind == QueryKind::Structured
    }

    /// Query text
    pub fn dql(&self) -> &str {
        &self.dql
    }

    /// Replace the query text
    pub fn set_dql(&mut self, dql: impl Into<String>) {
        self.dql = dql.into();
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name.trim_start_matches(':'))
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.parameters
            .insert(name.trim_start_matches(':').to_string(), value.into());
        self
    }

    pub fn first_result(&self) -> Option<usize> {
        self.first_result
    }

    pub fn set_first_result(&mut self, first_result: Option<usize>) -> &mut Self {
        self.first_result = first_result;
        self
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn set_max_results(&mut self, max_results: Option<usize>) -> &mut Self {
        self.max_results = max_results;
        self
    }

    pub fn hydration_mode(&self) -> HydrationMode {
        self.hydration_mode
    }

    pub fn set_hydration_mode(&mut self, mode: HydrationMode) -> &mut Self {
        self.hydration_mode = mode;
        self
    }

    /// Whether offset or limit restricts the rows
    pub fn is_paged(&self) -> bool {
        self.first_result.unwrap_or(0) > 0 || self.max_results.unwrap_or(0) > 0
    }

    /// Copy without offset and limit
    pub fn without_paging(&self) -> Self {
        let mut query = self.clone();
        query.first_result = None;
        query.max_results = None;
        query
    }

    /// Structural identity used by the query cache
    ///
    /// Two structured queries are the same when their texts and bound
    /// parameters are equal. The text is compared verbatim, so queries that
    /// differ only in formatting count as different. Native queries are never
    /// the same as anything.
    pub fn same_structure(&self, other: &Query) -> bool {
        self.is_structured()
            && other.is_structured()
            && self.dql == other.dql
            && self.parameters == other.parameters
    }

    /// Execute and return hydrated rows
    pub fn execute(&self, engine: &dyn QueryEngine) -> Result<Vec<Record>, EngineError> {
        engine.execute(self)
    }

    /// Execute and return the single scalar value
    pub fn single_scalar_result(&self, engine: &dyn QueryEngine) -> Result<Value, EngineError> {
        engine.execute_scalar(self)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dql)
    }
}
