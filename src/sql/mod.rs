//! Statement builders
//!
//! Insert, Update and Select over a [`Table`](crate::db::Table) descriptor,
//! rendered to parameterised PostgreSQL with `$n` placeholders.

pub mod insert;
pub mod predicate;
pub mod select;
pub mod statement;
pub mod update;

pub use insert::Insert;
pub use predicate::{CompareOp, Operand, Predicate};
pub use select::{Order, Select};
pub use statement::{BoundStatement, Mutation, Param, StatementKind};
pub use update::Update;
