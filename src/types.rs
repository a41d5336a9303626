//! Core types for query operations
//!
//! This module defines the core data structures shared by the query layer
//! and the in-memory engine:
//! - Tables, columns, and rows
//! - SQL data types and values
//! - Hydration modes and hydrated records (entities, arrays, scalars)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Database table representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    pub name: String,

    /// Column definitions
    pub columns: Vec<Column>,

    /// Identifier column used to deduplicate root entities.
    /// Falls back to the first column when unset.
    #[serde(default)]
    pub primary_key: Option<String>,

    /// Data rows
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: String, columns: Vec<Column>) -> Self {
        Self {
            name,
            columns,
            primary_key: None,
            rows: Vec::new(),
        }
    }

    /// Set the identifier column
    pub fn with_primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(column.to_string());
        self
    }

    /// Get number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of the identifier column
    pub fn primary_key_index(&self) -> usize {
        self.primary_key
            .as_deref()
            .and_then(|pk| self.column_index(pk))
            .unwrap_or(0)
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Data type
    pub data_type: DataType,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

/// SQL data types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    /// 32-bit integer
    Integer,

    /// 64-bit integer
    BigInt,

    /// Decimal number (stored as fixed-point integer)
    Decimal,

    /// Variable-length string
    Varchar(usize),

    /// Date (Unix timestamp)
    Date,

    /// Boolean value
    Boolean,
}

/// Database row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    /// Row values
    pub values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get value at column index
    pub fn get_value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get value by column name (requires table reference)
    pub fn get_value_by_name(&self, table: &Table, column_name: &str) -> Option<&Value> {
        let col_index = table.column_index(column_name)?;
        self.values.get(col_index)
    }
}

/// SQL value types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Value {
    /// 32-bit integer
    Integer(i32),

    /// 64-bit integer
    BigInt(i64),

    /// Decimal number (stored as fixed-point integer)
    Decimal(i64),

    /// String value
    String(String),

    /// Date value (Unix timestamp)
    Date(u64),

    /// Boolean value
    Boolean(bool),

    /// NULL value
    Null,
}

impl Value {
    /// Whether this is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of numeric values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(i64::from(*v)),
            Value::BigInt(v) | Value::Decimal(v) => Some(*v),
            Value::Date(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Hashable identity consistent with [`Value::compare`]
    ///
    /// Numeric values of any width collapse to `BigInt`, so `Integer(1)` and
    /// `BigInt(1)` deduplicate as one key.
    pub fn key(&self) -> Value {
        match self {
            Value::Integer(_) | Value::BigInt(_) | Value::Decimal(_) | Value::Date(_) => self
                .as_i64()
                .map(Value::BigInt)
                .unwrap_or_else(|| self.clone()),
            other => other.clone(),
        }
    }

    /// SQL truthiness: only `TRUE` passes a predicate
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Compare two values the way a predicate does
    ///
    /// Returns `None` when either side is NULL or the types are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => Some(a.as_i64()?.cmp(&b.as_i64()?)),
        }
    }

    /// Total ordering used for ORDER BY; NULLs sort first
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (a, b) => a
                .compare(b)
                .unwrap_or_else(|| a.type_rank().cmp(&b.type_rank())),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::BigInt(_) | Value::Decimal(_) | Value::Date(_) => 2,
            Value::String(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) | Value::Decimal(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Date(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Shape of the rows returned by an execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HydrationMode {
    /// Root entities with fetch-joined collections attached
    #[default]
    Object,

    /// One keyed map per result row (`alias.column` keys)
    Array,

    /// One positional value list per result row
    Scalar,
}

/// Hydrated entity
///
/// A root row plus the collections fetch-joined onto it, keyed by the joined table name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Source table
    pub table: String,

    /// Column values
    pub fields: BTreeMap<String, Value>,

    /// Fetch-joined collections
    pub collections: BTreeMap<String, Vec<Entity>>,
}

impl Entity {
    /// Create an entity from a table row
    pub fn from_row(table: &Table, row: &Row) -> Self {
        let fields = table
            .columns
            .iter()
            .zip(row.values.iter())
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect();
        Self {
            table: table.name.clone(),
            fields,
            collections: BTreeMap::new(),
        }
    }

    /// Field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Fetch-joined collection, empty when nothing was joined
    pub fn collection(&self, name: &str) -> &[Entity] {
        self.collections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A single hydrated result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Object hydration
    Entity(Entity),

    /// Array hydration
    Array(BTreeMap<String, Value>),

    /// Scalar hydration
    Scalar(Vec<Value>),
}

impl Record {
    /// Entity view of an object-hydrated record
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Record::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Keyed lookup for entity and array records
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Record::Entity(entity) => entity.get(key),
            Record::Array(map) => map.get(key),
            Record::Scalar(_) => None,
        }
    }

    /// Positional values of a scalar record
    pub fn scalars(&self) -> Option<&[Value]> {
        match self {
            Record::Scalar(values) => Some(values),
            _ => None,
        }
    }
}
