//! SELECT builder

use crate::db::schema::{Column, Table, quote_ident};
use crate::error::DbResult;
use crate::sql::predicate::Predicate;
use crate::sql::statement::{BoundStatement, Params, StatementKind};

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// SELECT of columns from one table
#[derive(Debug, Clone)]
pub struct Select<'t> {
    table: &'t Table,
    columns: Vec<Column>,
    filter: Option<Predicate>,
    order_by: Vec<(Column, Order)>,
}

impl<'t> Select<'t> {
    /// Select from `table`; all columns unless [`Select::columns`] is called
    pub fn from(table: &'t Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filter: None,
            order_by: Vec::new(),
        }
    }

    /// Choose the result columns, in order
    pub fn columns<'c>(mut self, columns: impl IntoIterator<Item = &'c Column>) -> Self {
        self.columns.extend(columns.into_iter().cloned());
        self
    }

    /// Restrict the rows returned; repeated calls are ANDed
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, column: &Column, order: Order) -> Self {
        self.order_by.push((column.clone(), order));
        self
    }

    /// Validate predicates and render the statement
    ///
    /// # Errors
    /// Returns `DbError::Binding` for unknown columns or malformed literals
    pub fn bind(self) -> DbResult<BoundStatement> {
        let output: Vec<Column> = if self.columns.is_empty() {
            self.table.columns().to_vec()
        } else {
            self.columns
                .iter()
                .map(|c| self.table.resolve(c).cloned())
                .collect::<DbResult<_>>()?
        };

        let names: Vec<String> = output.iter().map(|c| quote_ident(c.name())).collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            names.join(", "),
            self.table.quoted_name()
        );

        let mut params = Params::default();
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.render(self.table, &mut params)?);
        }

        if !self.order_by.is_empty() {
            let mut keys = Vec::with_capacity(self.order_by.len());
            for (column, order) in &self.order_by {
                let own = self.table.resolve(column)?;
                let direction = match order {
                    Order::Asc => "ASC",
                    Order::Desc => "DESC",
                };
                keys.push(format!("{} {}", quote_ident(own.name()), direction));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        Ok(BoundStatement {
            kind: StatementKind::Select,
            sql,
            params: params.into_vec(),
            output: output.into(),
        })
    }
}
