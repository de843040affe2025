//! UPDATE builder

use crate::db::schema::{Column, Table, quote_ident};
use crate::db::types::Value;
use crate::error::{DbError, DbResult};
use crate::sql::predicate::Predicate;
use crate::sql::statement::{BoundStatement, Mutation, Params, StatementKind};

/// UPDATE of one table, optionally filtered
#[derive(Debug, Clone)]
pub struct Update<'t> {
    table: &'t Table,
    assignments: Vec<(Column, Value)>,
    filter: Option<Predicate>,
}

impl<'t> Update<'t> {
    pub fn table(table: &'t Table) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filter: None,
        }
    }

    /// Assign a new value to a column
    pub fn set(mut self, column: &Column, value: impl Into<Value>) -> Self {
        self.assignments.push((column.clone(), value.into()));
        self
    }

    /// Restrict the rows updated; repeated calls are ANDed
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}

impl Mutation for Update<'_> {
    fn bind(self) -> DbResult<BoundStatement> {
        if self.assignments.is_empty() {
            return Err(DbError::Binding(format!(
                "UPDATE of {} assigns no columns",
                self.table.name()
            )));
        }

        let mut params = Params::default();
        let mut sets: Vec<String> = Vec::with_capacity(self.assignments.len());

        for (i, (column, value)) in self.assignments.iter().enumerate() {
            let own = self.table.resolve(column)?;
            if self.assignments[..i]
                .iter()
                .any(|(earlier, _)| earlier.name() == own.name())
            {
                return Err(DbError::Binding(format!(
                    "column {} assigned twice",
                    own.name()
                )));
            }
            value.check_against(own)?;
            let placeholder = params.push(value.clone(), own.sql_type());
            sets.push(format!("{} = {}", quote_ident(own.name()), placeholder));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table.quoted_name(),
            sets.join(", ")
        );
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.render(self.table, &mut params)?);
        }

        Ok(BoundStatement {
            kind: StatementKind::Update,
            sql,
            params: params.into_vec(),
            output: Vec::new().into(),
        })
    }
}
