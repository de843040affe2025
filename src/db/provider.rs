//! Database provider trait
//!
//! Defines the interface that database backends implement.
//! This abstraction allows for:
//! - A PostgreSQL backend over tokio-postgres
//! - Easy testing with mock implementations
//! - Consistent error classification

use crate::db::types::Row;
use crate::error::DbResult;
use crate::sql::BoundStatement;
use futures::stream::BoxStream;
use std::future::Future;

/// Rows produced by a backend for one statement.
///
/// Dropping the stream releases the backend cursor.
pub type RowStream<'a> = BoxStream<'a, DbResult<Row>>;

/// Main database provider trait
///
/// Methods take `&mut self`: a provider serves one statement at a time.
pub trait Database: Send {
    /// Execute a row-count statement (INSERT or UPDATE)
    ///
    /// # Errors
    /// Returns `DbError::ResultShapeMismatch` if the backend describes result
    /// columns for the statement, `DbError::Binding` if a parameter is
    /// rejected, and `DbError::BackendUnavailable` on connection loss.
    fn execute(&mut self, statement: &BoundStatement) -> impl Future<Output = DbResult<u64>> + Send;

    /// Run a row-producing statement (SELECT)
    ///
    /// Rows are decoded according to `statement.output`.
    ///
    /// # Errors
    /// Returns `DbError::ResultShapeMismatch` if the described columns differ
    /// from `statement.output` in count or type.
    fn query(
        &mut self,
        statement: &BoundStatement,
    ) -> impl Future<Output = DbResult<RowStream<'_>>> + Send;

    /// Run DDL or other statements without parameters or results
    fn batch_execute(&mut self, sql: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Check if the connection is still alive
    fn is_connected(&self) -> bool;
}
