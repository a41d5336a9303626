//! In-memory query engine
//!
//! Evaluates the SELECT subset the query builder produces directly over the
//! tables of a [`Database`]:
//!
//! ```text
//! SELECT <alias | alias.column | COUNT([DISTINCT] expr | *) | *>
//! FROM table alias
//! [INNER JOIN | LEFT OUTER JOIN table alias ON expr]*
//! [WHERE expr]
//! [ORDER BY expr [ASC | DESC], ...]
//! ```
//!
//! Execution runs in four steps: join, filter, stable sort (NULLs first),
//! then window and hydrate. Offset and limit come from the [`Query`], never
//! from the query text.

use crate::database::schema::Database;
use crate::error::EngineError;
use crate::query::builder::{JoinKind, Query};
use crate::query::engine::QueryEngine;
use crate::query::pagination::PaginationOptions;
use crate::query::parser::QueryParser;
use crate::types::{Entity, HydrationMode, Record, Row, Table, Value};
use log::{debug, trace};
use sqlparser::ast::{
    self, BinaryOperator, Expr, FunctionArg, FunctionArgExpr, FunctionArguments, GroupByExpr,
    JoinConstraint, JoinOperator, OrderBy, OrderByKind, SelectItem, TableFactor, UnaryOperator,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One row per source, `None` where a left join found no match
type Tuple<'a> = Vec<Option<&'a Row>>;

/// FROM or JOIN source
struct Source<'a> {
    alias: String,
    table: &'a Table,
    join: Option<(JoinKind, &'a Expr)>,
}

/// Select list item
enum Projection<'a> {
    /// Whole row of a source
    Alias(usize),

    /// Single value keyed by its alias or expression text
    Column { key: String, expr: &'a Expr },

    /// COUNT aggregate; `arg` is `None` for `COUNT(*)`
    Count {
        key: String,
        distinct: bool,
        arg: Option<&'a Expr>,
    },
}

/// Resolved query, borrowing the parsed text and the database tables
struct Plan<'a> {
    sources: Vec<Source<'a>>,
    projection: Vec<Projection<'a>>,
    selection: Option<&'a Expr>,
    order_by: Vec<(&'a Expr, bool)>,
    parameters: &'a BTreeMap<String, Value>,
}

fn unsupported(what: impl Into<String>) -> EngineError {
    EngineError::Unsupported(what.into())
}

fn unknown_column(qualifier: Option<&str>, name: &str) -> EngineError {
    EngineError::UnknownColumn(match qualifier {
        Some(qualifier) => format!("{}.{}", qualifier, name),
        None => name.to_string(),
    })
}

/// Three-valued truth of a predicate result
fn truth(value: &Value) -> Result<Option<bool>, EngineError> {
    match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(EngineError::TypeMismatch(format!(
            "expected a boolean, got {}",
            other
        ))),
    }
}

fn window<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

fn resolve_source<'a>(
    database: &'a Database,
    factor: &TableFactor,
    join: Option<(JoinKind, &'a Expr)>,
) -> Result<Source<'a>, EngineError> {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let table_name = name.to_string();
            let table = database
                .get_table(&table_name)
                .ok_or_else(|| EngineError::UnknownTable(table_name.clone()))?;
            let alias = alias
                .as_ref()
                .map(|alias| alias.name.value.clone())
                .unwrap_or(table_name);
            Ok(Source { alias, table, join })
        }
        other => Err(unsupported(format!("FROM {}", other))),
    }
}

impl<'a> Plan<'a> {
    fn build(
        database: &'a Database,
        query: &'a ast::Query,
        parameters: &'a BTreeMap<String, Value>,
    ) -> Result<Self, EngineError> {
        if query.limit_clause.is_some() {
            return Err(unsupported(
                "LIMIT/OFFSET in the query text, use first/max results instead",
            ));
        }

        let select = QueryParser::new().select_body(query)?;
        match &select.group_by {
            GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
            _ => return Err(unsupported("GROUP BY")),
        }
        if select.having.is_some() {
            return Err(unsupported("HAVING"));
        }

        let [from] = select.from.as_slice() else {
            return Err(unsupported(format!(
                "expected exactly one FROM source, found {}",
                select.from.len()
            )));
        };

        let mut sources = vec![resolve_source(database, &from.relation, None)?];
        for join in &from.joins {
            let (kind, constraint) = match &join.join_operator {
                JoinOperator::Inner(constraint) => (JoinKind::Inner, constraint),
                JoinOperator::LeftOuter(constraint) => (JoinKind::Left, constraint),
                _ => return Err(unsupported("join type other than INNER or LEFT OUTER")),
            };
            let JoinConstraint::On(on) = constraint else {
                return Err(unsupported("join without an ON condition"));
            };
            let source = resolve_source(database, &join.relation, Some((kind, on)))?;
            if sources.iter().any(|s| s.alias == source.alias) {
                return Err(unsupported(format!("duplicate alias {}", source.alias)));
            }
            sources.push(source);
        }

        let mut projection = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            match item {
                SelectItem::Wildcard(_) => {
                    projection.extend((0..sources.len()).map(Projection::Alias));
                }
                SelectItem::UnnamedExpr(expr) => {
                    projection.push(project(&sources, expr, expr.to_string())?);
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    projection.push(project(&sources, expr, alias.value.clone())?);
                }
                other => return Err(unsupported(format!("select item {}", other))),
            }
        }

        let aggregates = projection
            .iter()
            .filter(|p| matches!(p, Projection::Count { .. }))
            .count();
        if aggregates > 0 && aggregates != projection.len() {
            return Err(unsupported("aggregates mixed with plain columns"));
        }

        let order_by = match &query.order_by {
            None => Vec::new(),
            Some(OrderBy {
                kind: OrderByKind::Expressions(exprs),
                ..
            }) => exprs
                .iter()
                .map(|e| (&e.expr, e.options.asc != Some(false)))
                .collect(),
            Some(_) => return Err(unsupported("ORDER BY ALL")),
        };

        Ok(Self {
            sources,
            projection,
            selection: select.selection.as_ref(),
            order_by,
            parameters,
        })
    }

    fn source_index(&self, alias: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.alias == alias)
    }

    fn is_aggregate(&self) -> bool {
        matches!(self.projection.first(), Some(Projection::Count { .. }))
    }

    /// Index of the hydration root: the first selected alias
    fn root(&self) -> usize {
        self.projection
            .iter()
            .find_map(|p| match p {
                Projection::Alias(index) => Some(*index),
                _ => None,
            })
            .unwrap_or(0)
    }

    fn root_key(&self, tuple: &Tuple<'_>) -> Option<Value> {
        let root = self.root();
        let table = self.sources[root].table;
        tuple[root]
            .and_then(|row| row.get_value(table.primary_key_index()))
            .map(Value::key)
    }

    fn column(
        &self,
        tuple: &Tuple<'_>,
        qualifier: Option<&str>,
        name: &str,
    ) -> Result<Value, EngineError> {
        let (index, column) = match qualifier {
            Some(alias) => {
                let index = self
                    .source_index(alias)
                    .ok_or_else(|| unknown_column(qualifier, name))?;
                let column = self.sources[index]
                    .table
                    .column_index(name)
                    .ok_or_else(|| unknown_column(qualifier, name))?;
                (index, column)
            }
            None => self
                .sources
                .iter()
                .enumerate()
                .find_map(|(index, source)| source.table.column_index(name).map(|c| (index, c)))
                .ok_or_else(|| unknown_column(None, name))?,
        };

        Ok(tuple[index]
            .and_then(|row| row.get_value(column))
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn literal(&self, value: &ast::Value) -> Result<Value, EngineError> {
        match value {
            ast::Value::Number(n, _) => n.parse::<i64>().map(Value::BigInt).map_err(|_| {
                EngineError::TypeMismatch(format!("unsupported numeric literal {}", n))
            }),
            ast::Value::SingleQuotedString(s) => Ok(Value::String(s.clone())),
            ast::Value::Boolean(b) => Ok(Value::Boolean(*b)),
            ast::Value::Null => Ok(Value::Null),
            ast::Value::Placeholder(name) => {
                let name = name.trim_start_matches(':');
                self.parameters
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EngineError::MissingParameter(name.to_string()))
            }
            other => Err(unsupported(format!("literal {}", other))),
        }
    }

    fn eval(&self, expr: &Expr, tuple: &Tuple<'_>) -> Result<Value, EngineError> {
        match expr {
            Expr::Identifier(ident) => self.column(tuple, None, &ident.value),
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [alias, column] => self.column(tuple, Some(&alias.value), &column.value),
                _ => Err(EngineError::UnknownColumn(expr.to_string())),
            },
            Expr::Value(v) => self.literal(&v.value),
            Expr::Nested(inner) => self.eval(inner, tuple),
            Expr::UnaryOp { op, expr: inner } => {
                let value = self.eval(inner, tuple)?;
                match op {
                    UnaryOperator::Not => Ok(match truth(&value)? {
                        Some(b) => Value::Boolean(!b),
                        None => Value::Null,
                    }),
                    UnaryOperator::Minus if value.is_null() => Ok(Value::Null),
                    UnaryOperator::Minus => value
                        .as_i64()
                        .and_then(i64::checked_neg)
                        .map(Value::BigInt)
                        .ok_or_else(|| EngineError::TypeMismatch(format!("cannot negate {}", value))),
                    other => Err(unsupported(format!("operator {}", other))),
                }
            }
            Expr::IsNull(inner) => Ok(Value::Boolean(self.eval(inner, tuple)?.is_null())),
            Expr::IsNotNull(inner) => Ok(Value::Boolean(!self.eval(inner, tuple)?.is_null())),
            Expr::InList {
                expr: inner,
                list,
                negated,
            } => {
                let needle = self.eval(inner, tuple)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }

                let mut saw_null = false;
                for item in list {
                    let candidate = self.eval(item, tuple)?;
                    if candidate.is_null() {
                        saw_null = true;
                    } else if needle.compare(&candidate) == Some(Ordering::Equal) {
                        return Ok(Value::Boolean(!*negated));
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Boolean(*negated)
                })
            }
            Expr::BinaryOp { left, op, right } => self.binary(left, op, right, tuple),
            other => Err(unsupported(other.to_string())),
        }
    }

    fn binary(
        &self,
        left: &Expr,
        op: &BinaryOperator,
        right: &Expr,
        tuple: &Tuple<'_>,
    ) -> Result<Value, EngineError> {
        if matches!(op, BinaryOperator::And | BinaryOperator::Or) {
            let l = truth(&self.eval(left, tuple)?)?;
            let r = truth(&self.eval(right, tuple)?)?;
            let result = if *op == BinaryOperator::And {
                match (l, r) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            } else {
                match (l, r) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }
            };
            return Ok(result.map(Value::Boolean).unwrap_or(Value::Null));
        }

        let accept: fn(Ordering) -> bool = match op {
            BinaryOperator::Eq => Ordering::is_eq,
            BinaryOperator::NotEq => Ordering::is_ne,
            BinaryOperator::Lt => Ordering::is_lt,
            BinaryOperator::LtEq => Ordering::is_le,
            BinaryOperator::Gt => Ordering::is_gt,
            BinaryOperator::GtEq => Ordering::is_ge,
            other => return Err(unsupported(format!("operator {}", other))),
        };

        let l = self.eval(left, tuple)?;
        let r = self.eval(right, tuple)?;
        Ok(match l.compare(&r) {
            Some(ordering) => Value::Boolean(accept(ordering)),
            None => Value::Null,
        })
    }

    /// Joined and filtered tuples, in storage order
    fn tuples(&self) -> Result<Vec<Tuple<'a>>, EngineError> {
        let width = self.sources.len();
        let root: &'a Table = self.sources[0].table;
        let mut tuples: Vec<Tuple<'a>> = root
            .rows
            .iter()
            .map(|row| {
                let mut tuple = vec![None; width];
                tuple[0] = Some(row);
                tuple
            })
            .collect();

        for (index, source) in self.sources.iter().enumerate().skip(1) {
            let Some((kind, on)) = source.join else {
                continue;
            };
            let table: &'a Table = source.table;

            let mut joined = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let mut matched = false;
                for row in &table.rows {
                    let mut candidate = tuple.clone();
                    candidate[index] = Some(row);
                    if self.eval(on, &candidate)?.is_true() {
                        joined.push(candidate);
                        matched = true;
                    }
                }
                if !matched && kind == JoinKind::Left {
                    joined.push(tuple);
                }
            }
            tuples = joined;
        }

        if let Some(selection) = self.selection {
            let mut kept = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                if self.eval(selection, &tuple)?.is_true() {
                    kept.push(tuple);
                }
            }
            tuples = kept;
        }

        trace!("{} tuples after join and filter", tuples.len());
        Ok(tuples)
    }

    fn sort(&self, tuples: Vec<Tuple<'a>>) -> Result<Vec<Tuple<'a>>, EngineError> {
        if self.order_by.is_empty() {
            return Ok(tuples);
        }

        let mut keyed = tuples
            .into_iter()
            .map(|tuple| {
                let keys = self
                    .order_by
                    .iter()
                    .map(|(expr, _)| self.eval(expr, &tuple))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((keys, tuple))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        keyed.sort_by(|(a, _), (b, _)| {
            self.order_by
                .iter()
                .zip(a.iter().zip(b.iter()))
                .map(|((_, ascending), (x, y))| {
                    let ordering = x.sort_cmp(y);
                    if *ascending {
                        ordering
                    } else {
                        ordering.reverse()
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        Ok(keyed.into_iter().map(|(_, tuple)| tuple).collect())
    }

    fn count_values(
        &self,
        tuples: &[Tuple<'_>],
        distinct: bool,
        arg: Option<&Expr>,
    ) -> Result<u64, EngineError> {
        let Some(expr) = arg else {
            return Ok(tuples.len() as u64);
        };

        let alias = match expr {
            Expr::Identifier(ident) => self.source_index(&ident.value),
            _ => None,
        };

        let values: Vec<Value> = match alias {
            Some(index) => {
                let table = self.sources[index].table;
                tuples
                    .iter()
                    .filter_map(|tuple| tuple[index])
                    .map(|row| {
                        row.get_value(table.primary_key_index())
                            .map(Value::key)
                            .unwrap_or(Value::Null)
                    })
                    .collect()
            }
            None => {
                let mut values = Vec::with_capacity(tuples.len());
                for tuple in tuples {
                    let value = self.eval(expr, tuple)?;
                    if !value.is_null() {
                        values.push(value.key());
                    }
                }
                values
            }
        };

        let count = if distinct {
            values.into_iter().collect::<HashSet<_>>().len()
        } else {
            values.len()
        };
        Ok(count as u64)
    }

    fn aggregate(&self, tuples: &[Tuple<'_>], mode: HydrationMode) -> Result<Record, EngineError> {
        let mut values = Vec::with_capacity(self.projection.len());
        for projection in &self.projection {
            let Projection::Count { key, distinct, arg } = projection else {
                return Err(unsupported("aggregates mixed with plain columns"));
            };
            let count = self.count_values(tuples, *distinct, *arg)?;
            values.push((key.clone(), Value::BigInt(count as i64)));
        }

        Ok(match mode {
            HydrationMode::Array => Record::Array(values.into_iter().collect()),
            HydrationMode::Object | HydrationMode::Scalar => {
                Record::Scalar(values.into_iter().map(|(_, value)| value).collect())
            }
        })
    }

    /// Keyed values of one tuple, in select-list order
    fn project_values(&self, tuple: &Tuple<'_>) -> Result<Vec<(String, Value)>, EngineError> {
        let mut values = Vec::new();
        for projection in &self.projection {
            match projection {
                Projection::Alias(index) => {
                    let source = &self.sources[*index];
                    for (position, column) in source.table.columns.iter().enumerate() {
                        let value = tuple[*index]
                            .and_then(|row| row.get_value(position))
                            .cloned()
                            .unwrap_or(Value::Null);
                        values.push((format!("{}.{}", source.alias, column.name), value));
                    }
                }
                Projection::Column { key, expr } => {
                    values.push((key.clone(), self.eval(expr, tuple)?));
                }
                Projection::Count { .. } => {
                    return Err(unsupported("aggregates mixed with plain columns"));
                }
            }
        }
        Ok(values)
    }

    /// Group tuples into root entities with their fetch-joined collections
    fn hydrate_entities(&self, tuples: &[Tuple<'_>]) -> Vec<Record> {
        let root = self.root();
        let root_table = self.sources[root].table;
        let fetched: Vec<usize> = self
            .projection
            .iter()
            .filter_map(|p| match p {
                Projection::Alias(index) if *index != root => Some(*index),
                _ => None,
            })
            .collect();

        let mut entities: Vec<Entity> = Vec::new();
        let mut positions: HashMap<Value, usize> = HashMap::new();
        let mut members: HashSet<(usize, usize, Value)> = HashSet::new();

        for tuple in tuples {
            let Some(row) = tuple[root] else {
                continue;
            };
            let key = row
                .get_value(root_table.primary_key_index())
                .map(Value::key)
                .unwrap_or(Value::Null);
            let position = *positions.entry(key).or_insert_with(|| {
                entities.push(Entity::from_row(root_table, row));
                entities.len() - 1
            });

            for &index in &fetched {
                let table = self.sources[index].table;
                let collection = entities[position]
                    .collections
                    .entry(table.name.clone())
                    .or_default();
                if let Some(joined) = tuple[index] {
                    let joined_key = joined
                        .get_value(table.primary_key_index())
                        .map(Value::key)
                        .unwrap_or(Value::Null);
                    if members.insert((position, index, joined_key)) {
                        collection.push(Entity::from_row(table, joined));
                    }
                }
            }
        }

        entities.into_iter().map(Record::Entity).collect()
    }

    fn hydrate(&self, tuples: &[Tuple<'_>], mode: HydrationMode) -> Result<Vec<Record>, EngineError> {
        let selects_entities = self
            .projection
            .iter()
            .all(|p| matches!(p, Projection::Alias(_)));

        match mode {
            HydrationMode::Object if selects_entities => Ok(self.hydrate_entities(tuples)),
            HydrationMode::Object | HydrationMode::Array => tuples
                .iter()
                .map(|tuple| Ok(Record::Array(self.project_values(tuple)?.into_iter().collect())))
                .collect(),
            HydrationMode::Scalar => tuples
                .iter()
                .map(|tuple| {
                    Ok(Record::Scalar(
                        self.project_values(tuple)?
                            .into_iter()
                            .map(|(_, value)| value)
                            .collect(),
                    ))
                })
                .collect(),
        }
    }
}

/// Classify one select expression
fn project<'a>(
    sources: &[Source<'_>],
    expr: &'a Expr,
    key: String,
) -> Result<Projection<'a>, EngineError> {
    match expr {
        Expr::Identifier(ident) => {
            if let Some(index) = sources.iter().position(|s| s.alias == ident.value) {
                return Ok(Projection::Alias(index));
            }
            Ok(Projection::Column { key, expr })
        }
        Expr::Function(func) => {
            if !func.name.to_string().eq_ignore_ascii_case("COUNT") {
                return Err(unsupported(format!("function {}", func.name)));
            }

            let distinct = func
                .to_string()
                .to_ascii_uppercase()
                .contains("(DISTINCT ");
            let arg = match &func.args {
                FunctionArguments::List(list) => match list.args.as_slice() {
                    [FunctionArg::Unnamed(FunctionArgExpr::Wildcard)] => None,
                    [FunctionArg::Unnamed(FunctionArgExpr::Expr(arg))] => Some(arg),
                    _ => return Err(unsupported(format!("arguments of {}", func))),
                },
                _ => return Err(unsupported(format!("arguments of {}", func))),
            };

            Ok(Projection::Count { key, distinct, arg })
        }
        _ => Ok(Projection::Column { key, expr }),
    }
}

impl Database {
    fn parse(&self, query: &Query) -> Result<ast::Query, EngineError> {
        self.record_execution();
        QueryParser::new().parse_select(query.dql())
    }
}

impl QueryEngine for Database {
    fn execute(&self, query: &Query) -> Result<Vec<Record>, EngineError> {
        debug!(
            "Executing [{}] (offset {:?}, limit {:?}, {:?})",
            query.dql(),
            query.first_result(),
            query.max_results(),
            query.hydration_mode()
        );
        let ast = self.parse(query)?;
        let plan = Plan::build(self, &ast, query.parameters())?;
        let tuples = plan.tuples()?;

        if plan.is_aggregate() {
            let record = plan.aggregate(&tuples, query.hydration_mode())?;
            return Ok(window(vec![record], query.first_result(), query.max_results()));
        }

        let tuples = window(plan.sort(tuples)?, query.first_result(), query.max_results());
        plan.hydrate(&tuples, query.hydration_mode())
    }

    fn execute_scalar(&self, query: &Query) -> Result<Value, EngineError> {
        let mut scalar = query.clone();
        scalar.set_hydration_mode(HydrationMode::Scalar);

        let mut records = self.execute(&scalar)?.into_iter();
        let record = records.next().ok_or(EngineError::NoResult)?;
        if records.next().is_some() {
            return Err(EngineError::NonUniqueResult);
        }

        match record {
            Record::Scalar(mut values) if values.len() == 1 => Ok(values.remove(0)),
            _ => Err(EngineError::NonUniqueResult),
        }
    }

    fn paginated_count(
        &self,
        query: &Query,
        options: &PaginationOptions,
    ) -> Result<u64, EngineError> {
        debug!(
            "Paginated count of [{}] (fetch_join_collection {}, use_output_walkers {:?})",
            query.dql(),
            options.fetch_join_collection,
            options.use_output_walkers
        );
        let ast = self.parse(query)?;
        let plan = Plan::build(self, &ast, query.parameters())?;
        if plan.is_aggregate() {
            return Err(unsupported("paginated count of an aggregate query"));
        }

        let tuples = plan.tuples()?;
        let count = if options.fetch_join_collection {
            tuples
                .iter()
                .filter_map(|tuple| plan.root_key(tuple))
                .collect::<HashSet<_>>()
                .len()
        } else {
            tuples.len()
        };
        Ok(count as u64)
    }

    fn paginated_iterate(
        &self,
        query: &Query,
        options: &PaginationOptions,
    ) -> Result<Vec<Record>, EngineError> {
        if !options.fetch_join_collection {
            return self.execute(query);
        }

        debug!(
            "Paginated iterate of [{}] (offset {:?}, limit {:?})",
            query.dql(),
            query.first_result(),
            query.max_results()
        );
        let ast = self.parse(query)?;
        let plan = Plan::build(self, &ast, query.parameters())?;
        if plan.is_aggregate() {
            return Err(unsupported("paginated iteration of an aggregate query"));
        }

        let tuples = plan.sort(plan.tuples()?)?;

        let mut roots = Vec::new();
        let mut seen = HashSet::new();
        for tuple in &tuples {
            if let Some(key) = plan.root_key(tuple) {
                if seen.insert(key.clone()) {
                    roots.push(key);
                }
            }
        }

        let page: HashSet<Value> = window(roots, query.first_result(), query.max_results())
            .into_iter()
            .collect();
        trace!("Paginated window holds {} root entities", page.len());

        let tuples: Vec<Tuple<'_>> = tuples
            .into_iter()
            .filter(|tuple| plan.root_key(tuple).is_some_and(|key| page.contains(&key)))
            .collect();
        plan.hydrate(&tuples, query.hydration_mode())
    }
}
