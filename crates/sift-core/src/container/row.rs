//! Rows produced by executing a query against a container.

use std::fmt;
use std::sync::Arc;

use rusqlite::types::ValueRef;
use sift_common::QueryHash;

/// A raw storage cell, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl RawValue {
    /// Storage class name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Integer(_) => "integer",
            RawValue::Real(_) => "real",
            RawValue::Text(_) => "text",
            RawValue::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<ValueRef<'_>> for RawValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => RawValue::Null,
            ValueRef::Integer(i) => RawValue::Integer(i),
            ValueRef::Real(f) => RawValue::Real(f),
            // SQLite does not enforce encoding on TEXT cells.
            ValueRef::Text(bytes) => RawValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => RawValue::Blob(bytes.to_vec()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "NULL"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Real(x) => write!(f, "{x}"),
            RawValue::Text(s) => write!(f, "{s:?}"),
            RawValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

/// One result row: named raw values plus the identity of the query and the
/// row's offset within that query's result set.
///
/// Column names are shared between all rows of one query.
#[derive(Debug, Clone)]
pub struct Row {
    query_hash: QueryHash,
    offset: u64,
    columns: Arc<[String]>,
    values: Vec<RawValue>,
}

impl Row {
    /// A column without a matching value reads as absent from the row.
    pub fn new(
        query_hash: QueryHash,
        offset: u64,
        columns: Arc<[String]>,
        values: Vec<RawValue>,
    ) -> Self {
        Self {
            query_hash,
            offset,
            columns,
            values,
        }
    }

    pub fn query_hash(&self) -> QueryHash {
        self.query_hash
    }

    /// Zero-based position of this row in its query's results.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw cell by column name; `None` when the row has no such column.
    /// With duplicate names (unaliased joins) the first column wins.
    pub fn raw(&self, name: &str) -> Option<&RawValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    /// Iterate `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}
