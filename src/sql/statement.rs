//! Bound statements
//!
//! Builders render into a [`BoundStatement`]: SQL text with `$n`
//! placeholders, the parameter values with their declared types, and the
//! columns a row-producing statement is expected to return.

use crate::db::schema::Column;
use crate::db::types::{SqlType, Value};
use crate::error::DbResult;
use std::fmt;
use std::sync::Arc;

/// Kind of statement, which fixes the result shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Select,
}

impl StatementKind {
    /// Whether this kind yields a row count (as opposed to rows)
    pub fn yields_row_count(self) -> bool {
        matches!(self, StatementKind::Insert | StatementKind::Update)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Select => "SELECT",
        })
    }
}

/// A parameter value and the column type it is bound as
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub sql_type: SqlType,
}

/// Parameter accumulator handing out `$n` placeholders
#[derive(Debug, Default, Clone)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    /// Append a parameter and return its placeholder
    pub fn push(&mut self, value: Value, sql_type: SqlType) -> String {
        self.params.push(Param { value, sql_type });
        format!("${}", self.params.len())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_vec(self) -> Vec<Param> {
        self.params
    }
}

/// A statement ready to send to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<Param>,
    /// Expected result columns (empty for row-count statements)
    pub output: Arc<[Column]>,
}

/// Statements whose result is a row count
///
/// Implemented for Insert and Update only; sealed so no other statement can
/// reach the row-count path.
pub trait Mutation: sealed::Sealed {
    /// Validate bindings and render the statement
    ///
    /// # Errors
    /// Returns `DbError::Binding` if any value does not fit its column
    fn bind(self) -> DbResult<BoundStatement>;
}

pub(crate) mod sealed {
    pub trait Sealed {}

    impl Sealed for crate::sql::Insert<'_> {}
    impl Sealed for crate::sql::Update<'_> {}
}
