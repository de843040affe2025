//! INSERT builder

use crate::db::schema::{Column, Table, quote_ident};
use crate::db::types::Value;
use crate::error::{DbError, DbResult};
use crate::sql::statement::{BoundStatement, Mutation, Params, StatementKind};

/// Single-row INSERT into a table
#[derive(Debug, Clone)]
pub struct Insert<'t> {
    table: &'t Table,
    values: Vec<(Column, Value)>,
}

impl<'t> Insert<'t> {
    pub fn into(table: &'t Table) -> Self {
        Self {
            table,
            values: Vec::new(),
        }
    }

    /// Bind a value for one column
    pub fn value(mut self, column: &Column, value: impl Into<Value>) -> Self {
        self.values.push((column.clone(), value.into()));
        self
    }
}

impl Mutation for Insert<'_> {
    fn bind(self) -> DbResult<BoundStatement> {
        if self.values.is_empty() {
            return Err(DbError::Binding(format!(
                "INSERT into {} binds no columns",
                self.table.name()
            )));
        }

        let mut params = Params::default();
        let mut names = Vec::with_capacity(self.values.len());
        let mut placeholders = Vec::with_capacity(self.values.len());

        for (column, value) in &self.values {
            let own = self.table.resolve(column)?;
            if names.contains(&quote_ident(own.name())) {
                return Err(DbError::Binding(format!(
                    "column {} bound twice",
                    own.name()
                )));
            }
            value.check_against(own)?;
            names.push(quote_ident(own.name()));
            placeholders.push(params.push(value.clone(), own.sql_type()));
        }

        if let Some(missing) = self
            .table
            .columns()
            .iter()
            .filter(|c| !c.is_nullable())
            .find(|c| !self.values.iter().any(|(bound, _)| bound.name() == c.name()))
        {
            return Err(DbError::Binding(format!(
                "NOT NULL column {} has no value",
                missing.name()
            )));
        }

        Ok(BoundStatement {
            kind: StatementKind::Insert,
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table.quoted_name(),
                names.join(", "),
                placeholders.join(", ")
            ),
            params: params.into_vec(),
            output: Vec::new().into(),
        })
    }
}
