//! Value and result types
//!
//! A slim SQL value model plus the query result abstraction. A
//! [`QueryResult`] is an ordered, lazily fetchable sequence of rows bound to
//! the connection handle that produced it; fetching is fallible because
//! drivers can surface connection loss while rows are being read, not just at
//! dispatch time.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// SQL value that can hold any extracted cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer (covers TINYINT through BIGINT)
    Int64(i64),
    /// 64-bit floating point (REAL, DOUBLE PRECISION)
    Float64(f64),
    /// Text string (VARCHAR, TEXT, CHAR)
    String(String),
    /// Binary data (BYTEA, BLOB, VARBINARY)
    Bytes(Vec<u8>),
    /// Date without time (DATE)
    Date(NaiveDate),
    /// Time without date (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    DateTime(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    DateTimeTz(DateTime<Utc>),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to convert to bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int64(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            Self::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int64(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

/// A single result row: column names and values in matching order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Get column count
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column names
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get all values
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get value by column index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get value by column name
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }
}

/// Fallible row source backing a [`QueryResult`].
///
/// Driver errors can surface here, mid-stream, rather than at query dispatch.
#[async_trait]
pub trait RowFetch: Send {
    /// Fetch the next row; `Ok(None)` means the result set is exhausted
    async fn next_row(&mut self) -> Result<Option<Row>>;
}

/// An ordered, lazily fetchable sequence of rows from one query execution.
///
/// Bound to the connection handle that produced it: consume it fully before
/// probing the handle for liveness, since fetch errors count as connection
/// failures for that query.
pub struct QueryResult {
    rows: Box<dyn RowFetch>,
}

impl QueryResult {
    /// Wrap a driver row source
    pub fn new(rows: Box<dyn RowFetch>) -> Self {
        Self { rows }
    }

    /// Build a result over an in-memory, infallible row set
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Box::new(VecFetch {
                rows: rows.into_iter(),
            }),
        }
    }

    /// Fetch the next row
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        self.rows.next_row().await
    }

    /// Drain the remaining rows into a vector
    pub async fn fetch_all(mut self) -> Result<Vec<Row>> {
        let mut all = Vec::new();
        while let Some(row) = self.next_row().await? {
            all.push(row);
        }
        Ok(all)
    }
}

impl std::fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult").finish_non_exhaustive()
    }
}

struct VecFetch {
    rows: std::vec::IntoIter<Row>,
}

#[async_trait]
impl RowFetch for VecFetch {
    async fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}
