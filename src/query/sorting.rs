//! ORDER BY rewriting
//!
//! Sorting requests come in two shapes: an ordered list of `"column [ASC|DESC]"`
//! directives, or ordered column → direction pairs. Both normalize to
//! `"<column> <ASC|DESC>"`, ascending when no direction is given.
//!
//! Rewrites work on the parsed query, so only the outermost ORDER BY is ever
//! touched; ORDER BY clauses inside sub-queries stay as they are. Native
//! queries are left alone.

use crate::error::QueryError;
use crate::query::builder::{Direction, Query};
use crate::query::parser::QueryParser;
use sqlparser::ast::{OrderBy, OrderByKind};
use std::collections::BTreeMap;

/// Sorting request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sorting {
    /// `"column"`, `"column ASC"`, `"column desc"`, ...
    Directives(Vec<String>),

    /// `(column, direction)` pairs, applied in order
    Columns(Vec<(String, String)>),
}

impl Sorting {
    pub fn directives<I, S>(directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sorting::Directives(directives.into_iter().map(Into::into).collect())
    }

    pub fn columns<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Sorting::Columns(
            columns
                .into_iter()
                .map(|(column, direction)| (column.into(), direction.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Sorting::Directives(directives) => directives.is_empty(),
            Sorting::Columns(columns) => columns.is_empty(),
        }
    }

    /// Normalized `"<column> <ASC|DESC>"` directives
    pub fn normalize(&self) -> Result<Vec<String>, QueryError> {
        match self {
            Sorting::Directives(directives) => directives
                .iter()
                .map(|directive| normalize_directive(directive))
                .collect(),
            Sorting::Columns(columns) => columns
                .iter()
                .map(|(column, direction)| {
                    let column = column.trim();
                    if column.is_empty() {
                        return Err(empty_column());
                    }
                    Ok(format!("{} {}", column, direction.parse::<Direction>()?))
                })
                .collect(),
        }
    }
}

impl From<&str> for Sorting {
    fn from(directive: &str) -> Self {
        Sorting::directives([directive])
    }
}

impl From<Vec<&str>> for Sorting {
    fn from(directives: Vec<&str>) -> Self {
        Sorting::directives(directives)
    }
}

impl From<Vec<String>> for Sorting {
    fn from(directives: Vec<String>) -> Self {
        Sorting::Directives(directives)
    }
}

impl<const N: usize> From<[&str; N]> for Sorting {
    fn from(directives: [&str; N]) -> Self {
        Sorting::directives(directives)
    }
}

impl From<Vec<(&str, &str)>> for Sorting {
    fn from(columns: Vec<(&str, &str)>) -> Self {
        Sorting::columns(columns)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Sorting {
    fn from(columns: [(&str, &str); N]) -> Self {
        Sorting::columns(columns)
    }
}

impl From<BTreeMap<String, String>> for Sorting {
    fn from(columns: BTreeMap<String, String>) -> Self {
        Sorting::columns(columns)
    }
}

fn empty_column() -> QueryError {
    QueryError::InvalidArgument("Sorting column must not be empty".to_string())
}

/// Normalize one directive, defaulting to ascending order
pub fn normalize_directive(directive: &str) -> Result<String, QueryError> {
    let directive = directive.trim();
    if directive.is_empty() {
        return Err(empty_column());
    }

    if let Some((column, last)) = directive.rsplit_once(char::is_whitespace) {
        if let Ok(direction) = last.parse::<Direction>() {
            let column = column.trim_end();
            if column.is_empty() {
                return Err(empty_column());
            }
            return Ok(format!("{} {}", column, direction));
        }
    }

    Ok(format!("{} {}", directive, Direction::Asc))
}

fn parse_structured(parser: &QueryParser, query: &Query) -> Result<sqlparser::ast::Query, QueryError> {
    parser
        .parse_select(query.dql())
        .map_err(|e| QueryError::execution(e, Some(query)))
}

/// Remove the outermost ORDER BY clause
pub fn clear_sorting(query: &mut Query) -> Result<(), QueryError> {
    if !query.is_structured() {
        return Ok(());
    }

    let parser = QueryParser::new();
    let mut ast = parse_structured(&parser, query)?;
    if ast.order_by.take().is_some() {
        log::trace!("Cleared ORDER BY of [{}]", query.dql());
        query.set_dql(ast.to_string());
    }
    Ok(())
}

/// Append normalized directives to the outermost ORDER BY, creating it if needed
pub fn apply_sorting(query: &mut Query, directives: &[String]) -> Result<(), QueryError> {
    if directives.is_empty() || !query.is_structured() {
        return Ok(());
    }

    let parser = QueryParser::new();
    let mut addition: OrderBy = parser
        .parse_order_by(&directives.join(", "))
        .map_err(|e| QueryError::InvalidArgument(format!("Invalid sorting: {}", e)))?;
    let mut ast = parse_structured(&parser, query)?;

    let appended = match (ast.order_by.as_mut(), &mut addition.kind) {
        (
            Some(OrderBy {
                kind: OrderByKind::Expressions(existing),
                ..
            }),
            OrderByKind::Expressions(added),
        ) => {
            existing.append(added);
            true
        }
        _ => false,
    };
    if !appended {
        ast.order_by = Some(addition);
    }

    let dql = ast.to_string();
    log::trace!("Sorting rewrite [{}] -> [{}]", query.dql(), dql);
    query.set_dql(dql);
    Ok(())
}

/// Normalized directives of the outermost ORDER BY
pub fn current_sorting(query: &Query) -> Result<Vec<String>, QueryError> {
    if !query.is_structured() {
        return Ok(Vec::new());
    }

    let parser = QueryParser::new();
    let ast = parse_structured(&parser, query)?;
    Ok(parser
        .extract_order_by(&ast)
        .iter()
        .map(|e| {
            let direction = if e.options.asc == Some(false) {
                Direction::Desc
            } else {
                Direction::Asc
            };
            format!("{} {}", e.expr, direction)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(dql: &str) -> Query {
        Query::structured(dql)
    }

    #[test]
    fn test_normalize_defaults_to_asc() {
        assert_eq!(normalize_directive("name").unwrap(), "name ASC");
        assert_eq!(normalize_directive("  a.title  ").unwrap(), "a.title ASC");
    }

    #[test]
    fn test_normalize_keeps_direction() {
        assert_eq!(normalize_directive("name DESC").unwrap(), "name DESC");
        assert_eq!(normalize_directive("name   desc ").unwrap(), "name DESC");
        assert_eq!(normalize_directive("name asc").unwrap(), "name ASC");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize_directive("   ").is_err());
        assert!(Sorting::columns([("", "ASC")]).normalize().is_err());
    }

    #[test]
    fn test_columns_variant() {
        let sorting = Sorting::from([("name", "DESC"), ("id", "asc")]);
        assert_eq!(sorting.normalize().unwrap(), vec!["name DESC", "id ASC"]);

        let invalid = Sorting::from([("name", "sideways")]);
        assert!(matches!(
            invalid.normalize(),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_apply_creates_order_by() {
        let mut q = query("SELECT a FROM articles a WHERE a.enabled = :enabled");
        apply_sorting(&mut q, &["a.title ASC".to_string()]).unwrap();

        assert_eq!(current_sorting(&q).unwrap(), vec!["a.title ASC"]);
        assert!(q.dql().contains(":enabled"));
    }

    #[test]
    fn test_apply_appends() {
        let mut q = query("SELECT a FROM articles a ORDER BY a.id DESC");
        apply_sorting(&mut q, &["a.title ASC".to_string()]).unwrap();
        apply_sorting(&mut q, &["a.enabled DESC".to_string()]).unwrap();

        assert_eq!(
            current_sorting(&q).unwrap(),
            vec!["a.id DESC", "a.title ASC", "a.enabled DESC"]
        );
    }

    #[test]
    fn test_clear_only_outermost() {
        let mut q = query(
            "SELECT a FROM articles a WHERE a.id IN \
             (SELECT c.article_id FROM comments c ORDER BY c.id) ORDER BY a.title DESC",
        );
        clear_sorting(&mut q).unwrap();

        assert!(current_sorting(&q).unwrap().is_empty());
        assert!(q.dql().contains("ORDER BY c.id"));
    }

    #[test]
    fn test_clear_then_apply() {
        let mut q = query("SELECT a FROM articles a ORDER BY a.id DESC");
        clear_sorting(&mut q).unwrap();
        apply_sorting(&mut q, &["a.title ASC".to_string()]).unwrap();

        assert_eq!(current_sorting(&q).unwrap(), vec!["a.title ASC"]);
    }

    #[test]
    fn test_native_untouched() {
        let mut q = Query::native("SELECT * FROM articles ORDER BY id");
        clear_sorting(&mut q).unwrap();
        apply_sorting(&mut q, &["title ASC".to_string()]).unwrap();

        assert_eq!(q.dql(), "SELECT * FROM articles ORDER BY id");
    }

    #[test]
    fn test_invalid_directive() {
        let mut q = query("SELECT a FROM articles a");
        let result = apply_sorting(&mut q, &["a.title ASC ASC".to_string()]);
        assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
    }
}
