//! Constraint objects
//!
//! Query types record their filters and sort directives as an ordered list of
//! [`Constraint`]s and replay them onto a fresh [`QueryBuilder`] every time a
//! query is built. Replaying the same list always renders the same query
//! text, which is what makes the query cache hit.
//!
//! # Example
//!
//! ```rust
//! use query_object::query::{Constraint, Constraints, Direction, QueryBuilder};
//!
//! let mut constraints = Constraints::new();
//! constraints
//!     .push(Constraint::filter("a.enabled = :enabled", [("enabled", true.into())]))
//!     .push(Constraint::order_by("a.title", Direction::Asc));
//!
//! let mut qb = QueryBuilder::new("articles", "a");
//! constraints.apply(&mut qb);
//! assert!(qb.dql().ends_with("ORDER BY a.title ASC"));
//! ```

use crate::query::builder::{Direction, JoinKind, QueryBuilder};
use crate::types::Value;

/// A replayable query modification
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Predicate with its bound parameters
    Where {
        condition: String,
        parameters: Vec<(String, Value)>,
    },

    /// ORDER BY directive
    OrderBy { sort: String, direction: Direction },

    /// Join; `fetch` also selects the joined alias so it is hydrated
    Join {
        kind: JoinKind,
        table: String,
        alias: String,
        on: String,
        fetch: bool,
    },

    /// Replace the select list
    Select(String),
}

impl Constraint {
    pub fn filter<I, K>(condition: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Constraint::Where {
            condition: condition.to_string(),
            parameters: parameters
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    pub fn order_by(sort: &str, direction: Direction) -> Self {
        Constraint::OrderBy {
            sort: sort.to_string(),
            direction,
        }
    }

    pub fn fetch_join(kind: JoinKind, table: &str, alias: &str, on: &str) -> Self {
        Constraint::Join {
            kind,
            table: table.to_string(),
            alias: alias.to_string(),
            on: on.to_string(),
            fetch: true,
        }
    }

    /// Apply to a builder
    pub fn apply(&self, qb: &mut QueryBuilder) {
        match self {
            Constraint::Where {
                condition,
                parameters,
            } => {
                qb.and_where(condition);
                for (name, value) in parameters {
                    qb.set_parameter(name, value.clone());
                }
            }
            Constraint::OrderBy { sort, direction } => {
                qb.add_order_by(sort, *direction);
            }
            Constraint::Join {
                kind,
                table,
                alias,
                on,
                fetch,
            } => {
                qb.join(*kind, table, alias, on);
                if *fetch {
                    qb.add_select(alias);
                }
            }
            Constraint::Select(expr) => {
                qb.select(expr);
            }
        }
    }
}

/// Ordered constraint list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    items: Vec<Constraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, constraint: Constraint) -> &mut Self {
        self.items.push(constraint);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.items.iter()
    }

    /// Only the predicates and joins, e.g. for a count query
    pub fn filters(&self) -> impl Iterator<Item = &Constraint> {
        self.items
            .iter()
            .filter(|c| matches!(c, Constraint::Where { .. } | Constraint::Join { .. }))
    }

    /// Replay in insertion order
    pub fn apply(&self, qb: &mut QueryBuilder) {
        for constraint in &self.items {
            constraint.apply(qb);
        }
    }
}

impl FromIterator<Constraint> for Constraints {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
