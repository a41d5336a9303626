//! Query text parsing
//!
//! Structured query texts are plain SQL SELECTs. Sorting rewrites and the
//! in-memory engine both work on the `sqlparser` AST produced here.
//!
//! # Example
//!
//! ```rust
//! use query_object::query::QueryParser;
//!
//! let parser = QueryParser::new();
//! let query = parser.parse_select("SELECT a FROM articles a ORDER BY a.title")?;
//! assert_eq!(parser.extract_order_by(&query).len(), 1);
//! # Ok::<(), query_object::error::EngineError>(())
//! ```

use crate::error::EngineError;
use sqlparser::ast::{OrderBy, OrderByExpr, OrderByKind, Query, Select, SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Parser for structured query texts, generic SQL dialect
#[derive(Debug)]
pub struct QueryParser {
    dialect: GenericDialect,
}

impl QueryParser {
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }

    /// Parse exactly one statement
    pub fn parse(&self, query: &str) -> Result<Statement, EngineError> {
        let mut ast = Parser::parse_sql(&self.dialect, query)?;

        match ast.len() {
            1 => Ok(ast.remove(0)),
            n => Err(EngineError::Unsupported(format!(
                "expected exactly one statement, found {}",
                n
            ))),
        }
    }

    /// Parse a query text that must be a SELECT
    pub fn parse_select(&self, query: &str) -> Result<Query, EngineError> {
        match self.parse(query)? {
            Statement::Query(query) => Ok(*query),
            other => Err(EngineError::Unsupported(format!(
                "expected SELECT query, got {}",
                other
            ))),
        }
    }

    /// The plain SELECT body of a query
    pub fn select_body<'q>(&self, query: &'q Query) -> Result<&'q Select, EngineError> {
        match &*query.body {
            SetExpr::Select(select) => Ok(&**select),
            other => Err(EngineError::Unsupported(format!(
                "expected a plain SELECT, got {}",
                other
            ))),
        }
    }

    /// Extract the outermost ORDER BY expressions
    ///
    /// ORDER BY clauses of sub-queries live inside the body and are never
    /// returned here.
    pub fn extract_order_by(&self, query: &Query) -> Vec<OrderByExpr> {
        query
            .order_by
            .as_ref()
            .map(|order_by| match &order_by.kind {
                OrderByKind::All(_) => vec![],
                OrderByKind::Expressions(exprs) => exprs.clone(),
            })
            .unwrap_or_default()
    }

    /// Parse a list of ORDER BY directives (`"a.title DESC, a.id"`)
    pub fn parse_order_by(&self, directives: &str) -> Result<OrderBy, EngineError> {
        let query = self.parse_select(&format!("SELECT 1 ORDER BY {}", directives))?;
        query
            .order_by
            .ok_or_else(|| EngineError::Unsupported(format!("invalid sorting: {}", directives)))
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}
