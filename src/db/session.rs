//! SQL execution façade
//!
//! [`Session`] is the entry point for running statements. Row-count
//! statements go through [`Session::execute`] and come back as a
//! [`RowCount`]; SELECTs go through [`Session::query`] and come back as a
//! [`RowSequence`]. The two paths accept disjoint statement types, so a row
//! count can never be read as row data or the other way round.

use crate::config::ConnectionConfig;
use crate::db::postgres::PostgresProvider;
use crate::db::provider::{Database, RowStream};
use crate::db::schema::{Column, Table};
use crate::db::types::{Row, RowCount};
use crate::error::DbResult;
use crate::sql::{Mutation, Select};
use futures::stream::{FusedStream, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// One logical connection and the statements issued on it.
///
/// Every operation borrows the session mutably, so statements run one at a
/// time and in issue order.
pub struct Session<D: Database = PostgresProvider> {
    db: D,
}

impl Session<PostgresProvider> {
    /// Connect to PostgreSQL.
    ///
    /// The receiver fires if the background connection is lost.
    pub async fn connect(
        config: &ConnectionConfig,
    ) -> DbResult<(Self, mpsc::UnboundedReceiver<String>)> {
        let (provider, conn_err_rx) = PostgresProvider::connect(config).await?;
        Ok((Self::new(provider), conn_err_rx))
    }
}

impl<D: Database> Session<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// The underlying provider
    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_connected()
    }

    /// Execute an INSERT or UPDATE and return the number of rows affected.
    ///
    /// # Errors
    /// - `DbError::Binding` if a value does not fit its column
    /// - `DbError::ResultShapeMismatch` if the backend would return rows
    /// - `DbError::BackendUnavailable` on connection failure
    pub async fn execute<S: Mutation>(&mut self, statement: S) -> DbResult<RowCount> {
        let bound = statement.bind()?;
        debug_assert!(bound.kind.yields_row_count());
        tracing::debug!(kind = %bound.kind, sql = %bound.sql, "execute");
        tracing::trace!(params = bound.params.len(), "binding parameters");

        match self.db.execute(&bound).await {
            Ok(count) => {
                tracing::debug!(kind = %bound.kind, rows = count, "executed");
                Ok(RowCount::new(count))
            }
            Err(e) => {
                tracing::debug!(kind = %bound.kind, error = %e, "execute failed");
                Err(e)
            }
        }
    }

    /// Run a SELECT and return its rows as a lazy, single-pass sequence.
    ///
    /// The sequence borrows the session; drop it (or call
    /// [`RowSequence::close`]) to release the cursor early.
    ///
    /// # Errors
    /// - `DbError::Binding` for malformed predicate literals
    /// - `DbError::ResultShapeMismatch` if the backend's columns differ from
    ///   the requested ones
    /// - `DbError::BackendUnavailable` on connection failure
    pub async fn query(&mut self, statement: Select<'_>) -> DbResult<RowSequence<'_>> {
        let bound = statement.bind()?;
        debug_assert!(!bound.kind.yields_row_count());
        tracing::debug!(kind = %bound.kind, sql = %bound.sql, "query");
        tracing::trace!(params = bound.params.len(), "binding parameters");

        let columns = Arc::clone(&bound.output);
        let stream = self.db.query(&bound).await.inspect_err(|e| {
            tracing::debug!(kind = %bound.kind, error = %e, "query failed");
        })?;
        Ok(RowSequence::new(columns, stream))
    }

    /// Create a table from its descriptor (no-op if it exists)
    pub async fn create_table(&mut self, table: &Table) -> DbResult<()> {
        let sql = table.create_sql();
        tracing::debug!(sql = %sql, "create table");
        self.db.batch_execute(&sql).await
    }

    /// Remove all rows from the given tables
    pub async fn truncate(&mut self, tables: &[&Table]) -> DbResult<()> {
        for table in tables {
            let sql = table.truncate_sql();
            tracing::debug!(sql = %sql, "truncate");
            self.db.batch_execute(&sql).await?;
        }
        Ok(())
    }

    /// Drop a table if it exists
    pub async fn drop_table(&mut self, table: &Table) -> DbResult<()> {
        let sql = table.drop_sql();
        tracing::debug!(sql = %sql, "drop table");
        self.db.batch_execute(&sql).await
    }
}

/// Rows produced by one SELECT.
///
/// Finite and single-pass: once the rows are exhausted, or an error has been
/// yielded, every further poll returns `None`. Rows already yielded stay
/// valid after an error. The backend cursor is released as soon as the
/// sequence ends, is closed, or is dropped.
pub struct RowSequence<'a> {
    columns: Arc<[Column]>,
    inner: Option<RowStream<'a>>,
    delivered: usize,
}

impl<'a> RowSequence<'a> {
    pub(crate) fn new(columns: Arc<[Column]>, stream: RowStream<'a>) -> Self {
        Self {
            columns,
            inner: Some(stream),
            delivered: 0,
        }
    }

    /// Result columns, in row order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of rows yielded so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Whether the sequence has ended (drained, failed, or closed)
    pub fn is_exhausted(&self) -> bool {
        self.inner.is_none()
    }

    /// Next row, or `None` when the sequence has ended
    pub async fn next_row(&mut self) -> Option<DbResult<Row>> {
        self.next().await
    }

    /// Release the cursor without draining the remaining rows
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::trace!(delivered = self.delivered, "row sequence closed early");
        }
    }

    /// Drain the remaining rows.
    ///
    /// # Errors
    /// Returns the first error the backend yields; rows before it are lost
    /// to the caller, so iterate with [`RowSequence::next_row`] when partial
    /// results matter.
    pub async fn collect_rows(&mut self) -> DbResult<Vec<Row>> {
        self.try_collect().await
    }
}

impl Stream for RowSequence<'_> {
    type Item = DbResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(row))) => {
                self.delivered += 1;
                Poll::Ready(Some(Ok(row)))
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::debug!(delivered = self.delivered, error = %e, "row sequence failed");
                self.inner = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                tracing::trace!(delivered = self.delivered, "row sequence exhausted");
                self.inner = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Some(inner) => (0, inner.size_hint().1),
            None => (0, Some(0)),
        }
    }
}

impl FusedStream for RowSequence<'_> {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl std::fmt::Debug for RowSequence<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSequence")
            .field("columns", &self.columns)
            .field("delivered", &self.delivered)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
