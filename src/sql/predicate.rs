//! WHERE-clause predicates
//!
//! A predicate compares a column with a literal or with another column.
//! Predicates combine with AND.

use crate::db::schema::{Column, Table, quote_ident};
use crate::db::types::Value;
use crate::error::{DbError, DbResult};
use crate::sql::statement::Params;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Column(Column),
}

/// A boolean condition over a table's columns
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: Column,
        op: CompareOp,
        operand: Operand,
    },
    And(Vec<Predicate>),
}

impl Predicate {
    /// Both this and `other` must hold
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Render against `table`, appending literals to `params`.
    ///
    /// Columns are resolved against the table and literals are checked
    /// against the column they are compared with.
    pub(crate) fn render(&self, table: &Table, params: &mut Params) -> DbResult<String> {
        match self {
            Predicate::Compare {
                column,
                op,
                operand,
            } => {
                let own = table.resolve(column)?;
                let rhs = match operand {
                    Operand::Literal(Value::Null) => {
                        return Err(DbError::Binding(format!(
                            "cannot compare column {} with NULL using {}",
                            column.name(),
                            op.as_sql()
                        )));
                    }
                    Operand::Literal(value) => {
                        value.check_comparable(own)?;
                        params.push(value.clone(), own.sql_type())
                    }
                    Operand::Column(other) => {
                        let other = table.resolve(other)?;
                        if other.sql_type() != own.sql_type() {
                            return Err(DbError::Binding(format!(
                                "cannot compare {} ({}) with {} ({})",
                                own.name(),
                                own.sql_type(),
                                other.name(),
                                other.sql_type()
                            )));
                        }
                        quote_ident(other.name())
                    }
                };
                Ok(format!("{} {} {}", quote_ident(own.name()), op.as_sql(), rhs))
            }
            Predicate::And(parts) if parts.is_empty() => Ok("TRUE".to_string()),
            Predicate::And(parts) => {
                let rendered = parts
                    .iter()
                    .map(|p| p.render(table, params).map(|sql| format!("({})", sql)))
                    .collect::<DbResult<Vec<_>>>()?;
                Ok(rendered.join(" AND "))
            }
        }
    }
}

fn compare(column: &Column, op: CompareOp, operand: Operand) -> Predicate {
    Predicate::Compare {
        column: column.clone(),
        op,
        operand,
    }
}

impl Column {
    /// `column = value`
    pub fn eq(&self, value: impl Into<Value>) -> Predicate {
        compare(self, CompareOp::Eq, Operand::Literal(value.into()))
    }

    /// `column <> value`
    pub fn ne(&self, value: impl Into<Value>) -> Predicate {
        compare(self, CompareOp::Ne, Operand::Literal(value.into()))
    }

    /// `column < value`
    pub fn lt(&self, value: impl Into<Value>) -> Predicate {
        compare(self, CompareOp::Lt, Operand::Literal(value.into()))
    }

    /// `column <= value`
    pub fn le(&self, value: impl Into<Value>) -> Predicate {
        compare(self, CompareOp::Le, Operand::Literal(value.into()))
    }

    /// `column > value`
    pub fn gt(&self, value: impl Into<Value>) -> Predicate {
        compare(self, CompareOp::Gt, Operand::Literal(value.into()))
    }

    /// `column >= value`
    pub fn ge(&self, value: impl Into<Value>) -> Predicate {
        compare(self, CompareOp::Ge, Operand::Literal(value.into()))
    }

    /// Compare this column with another column of the same table
    pub fn cmp_column(&self, op: CompareOp, other: &Column) -> Predicate {
        compare(self, op, Operand::Column(other.clone()))
    }
}
