//! In-memory provider for unit tests
//!
//! Replays scripted replies and records every statement it receives.

use crate::db::provider::{Database, RowStream};
use crate::db::types::Row;
use crate::error::{DbError, DbResult};
use crate::sql::BoundStatement;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Scripted reply for the next `execute` or `query`
pub enum MockReply {
    Count(u64),
    Rows(Vec<DbResult<Row>>),
    Error(DbError),
}

pub struct MockDatabase {
    replies: VecDeque<MockReply>,
    executed: Vec<BoundStatement>,
    batches: Vec<String>,
    cursor_released: Arc<AtomicBool>,
}

/// Sets the flag when the row stream holding it is dropped
struct CursorGuard(Arc<AtomicBool>);

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockDatabase {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: replies.into(),
            executed: Vec::new(),
            batches: Vec::new(),
            cursor_released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Statements passed to `execute` and `query`, in order
    pub fn executed(&self) -> &[BoundStatement] {
        &self.executed
    }

    /// SQL passed to `batch_execute`, in order
    pub fn batches(&self) -> &[String] {
        &self.batches
    }

    /// Flag set once the most recent row stream is dropped
    pub fn cursor_released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cursor_released)
    }

    fn next_reply(&mut self, statement: &BoundStatement) -> DbResult<MockReply> {
        self.executed.push(statement.clone());
        self.replies
            .pop_front()
            .ok_or_else(|| DbError::BackendUnavailable("mock has no scripted reply".into()))
    }
}

impl Database for MockDatabase {
    async fn execute(&mut self, statement: &BoundStatement) -> DbResult<u64> {
        match self.next_reply(statement)? {
            MockReply::Count(n) => Ok(n),
            MockReply::Rows(_) => Err(DbError::ResultShapeMismatch(
                "scripted rows for a row-count statement".into(),
            )),
            MockReply::Error(e) => Err(e),
        }
    }

    async fn query(&mut self, statement: &BoundStatement) -> DbResult<RowStream<'_>> {
        match self.next_reply(statement)? {
            MockReply::Rows(rows) => {
                self.cursor_released.store(false, Ordering::SeqCst);
                let guard = CursorGuard(Arc::clone(&self.cursor_released));
                Ok(futures::stream::iter(rows)
                    .map(move |row| {
                        let _held = &guard;
                        row
                    })
                    .boxed())
            }
            MockReply::Count(_) => Err(DbError::ResultShapeMismatch(
                "scripted row count for a SELECT".into(),
            )),
            MockReply::Error(e) => Err(e),
        }
    }

    async fn batch_execute(&mut self, sql: &str) -> DbResult<()> {
        self.batches.push(sql.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
