//! Database type definitions
//!
//! Declared column types, bound values, and the typed rows and row counts
//! returned by the façade.

use crate::db::schema::Column;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Datelike, SubsecRound, Utc};
use std::fmt;
use std::sync::Arc;

/// Fractional-second digits the backend stores for `timestamptz`
pub const INSTANT_PRECISION_DIGITS: u16 = 6;

/// Earliest year `timestamptz` can hold (4713 BC, astronomical numbering)
const MIN_INSTANT_YEAR: i32 = -4712;

/// Latest year `timestamptz` can hold
const MAX_INSTANT_YEAR: i32 = 294_276;

/// Declared semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// Text with a maximum length in characters
    Varchar(u32),
    /// Timezone-independent point in time
    Instant,
}

impl SqlType {
    /// Get the DDL spelling of this type
    pub fn display_name(&self) -> String {
        match self {
            SqlType::Varchar(n) => format!("varchar({})", n),
            SqlType::Instant => "timestamptz".to_string(),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// A literal value bound into a statement or read back from a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// NULL value
    Null,

    /// Text/string value
    Text(String),

    /// Instant-in-time value
    Instant(DateTime<Utc>),
}

impl Value {
    /// Short name of the runtime type, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Instant(_) => "instant",
        }
    }

    /// Check this value against a column's declared type and nullability.
    ///
    /// Never coerces: a mismatch is a `DbError::Binding`.
    pub fn check_against(&self, column: &Column) -> DbResult<()> {
        match (self, column.sql_type()) {
            (Value::Null, _) if column.is_nullable() => Ok(()),
            (Value::Null, _) => Err(DbError::Binding(format!(
                "column {} is NOT NULL",
                column.name()
            ))),
            (Value::Text(s), SqlType::Varchar(max)) => {
                let len = s.chars().count();
                if len > max as usize {
                    Err(DbError::Binding(format!(
                        "value of {} characters exceeds {} for column {}",
                        len,
                        column.sql_type(),
                        column.name()
                    )))
                } else {
                    Ok(())
                }
            }
            (Value::Instant(t), SqlType::Instant) => check_instant(t).map_err(|reason| {
                DbError::Binding(format!("column {}: {}", column.name(), reason))
            }),
            (value, declared) => Err(DbError::Binding(format!(
                "cannot bind {} value to column {} of type {}",
                value.kind(),
                column.name(),
                declared
            ))),
        }
    }

    /// Check a comparison literal against the column it is compared with.
    ///
    /// Like [`Value::check_against`], except that text longer than the
    /// column's max length is allowed: it simply matches no rows.
    pub fn check_comparable(&self, column: &Column) -> DbResult<()> {
        match (self, column.sql_type()) {
            (Value::Text(_), SqlType::Varchar(_)) => Ok(()),
            _ => self.check_against(column),
        }
    }
}

/// Reject instants the backend would truncate or cannot represent
fn check_instant(t: &DateTime<Utc>) -> std::result::Result<(), String> {
    if t.timestamp_subsec_nanos() % 1_000 != 0 {
        return Err(format!(
            "instant {} has sub-microsecond precision and would be truncated",
            t.to_rfc3339()
        ));
    }
    if !(MIN_INSTANT_YEAR..=MAX_INSTANT_YEAR).contains(&t.year()) {
        return Err(format!("instant {} is outside the storable range", t));
    }
    Ok(())
}

/// The current instant at backend precision.
///
/// `Utc::now()` can carry nanoseconds that would not survive a round trip.
pub fn instant_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(INSTANT_PRECISION_DIGITS)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Instant(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Number of rows affected by an Insert or Update
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowCount(u64);

impl RowCount {
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<u64> for RowCount {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

/// A single row of query results
///
/// Values are in the order of the originating Select's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row; the caller guarantees one value per column
    pub(crate) fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Cell values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Column descriptors in value order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Raw value for a column, matched by name
    pub fn value(&self, column: &Column) -> DbResult<&Value> {
        self.columns
            .iter()
            .position(|c| c.name() == column.name())
            .map(|i| &self.values[i])
            .ok_or_else(|| {
                DbError::ResultShapeMismatch(format!("row has no column {}", column.name()))
            })
    }

    /// Typed value for a column.
    ///
    /// Fails with `ResultShapeMismatch` if the column is absent or its value
    /// is not a `T`.
    pub fn get<T: FromValue>(&self, column: &Column) -> DbResult<T> {
        T::from_value(self.value(column)?).ok_or_else(|| {
            DbError::ResultShapeMismatch(format!(
                "column {} of type {} cannot be read as {}",
                column.name(),
                column.sql_type(),
                std::any::type_name::<T>()
            ))
        })
    }
}

/// Conversion from a row value into a Rust type
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Instant(t) => Some(*t),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
