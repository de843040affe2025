//! Database abstraction layer
//!
//! This module provides the typed execution façade ([`Session`]) over a
//! trait-based backend abstraction, allowing a PostgreSQL backend and easy
//! testing with mocks.

pub mod postgres;
pub mod provider;
pub mod schema;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export main types
pub use provider::{Database, RowStream};
pub use schema::{Column, Table, TableBuilder};
pub use session::{RowSequence, Session};
pub use types::{FromValue, Row, RowCount, SqlType, Value, instant_now};
