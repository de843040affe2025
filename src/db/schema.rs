//! Column and table descriptors
//!
//! Descriptors are immutable once built. Statements borrow a [`Table`] and
//! refer to its columns; the DDL used to bootstrap and reset the schema is
//! rendered from the same descriptors.

use crate::db::types::SqlType;
use crate::error::{DbError, DbResult};
use std::collections::HashSet;

/// A table column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    name: String,
    sql_type: SqlType,
    nullable: bool,
}

impl Column {
    /// A nullable column of the given type
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
        }
    }

    /// A nullable `varchar(max_len)` column
    pub fn varchar(name: impl Into<String>, max_len: u32) -> Self {
        Self::new(name, SqlType::Varchar(max_len))
    }

    /// A nullable `timestamptz` column
    pub fn instant(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Instant)
    }

    /// The same column, declared NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Column definition as it appears inside CREATE TABLE
    fn definition_sql(&self) -> String {
        let mut def = format!("{} {}", quote_ident(&self.name), self.sql_type.display_name());
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }
}

/// A database table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
    temporary: bool,
}

/// Builder for [`Table`]; validation happens in [`TableBuilder::build`]
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
    temporary: bool,
}

impl Table {
    /// Start describing a table
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            temporary: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Primary key column names
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a caller-supplied column against this table.
    ///
    /// Returns the table's own descriptor, which carries the effective
    /// nullability (primary key columns are always NOT NULL).
    pub fn resolve(&self, column: &Column) -> DbResult<&Column> {
        match self.column(column.name()) {
            Some(own) if own.sql_type == column.sql_type => Ok(own),
            Some(own) => Err(DbError::Binding(format!(
                "column {} is declared {} in table {}, not {}",
                column.name(),
                own.sql_type,
                self.name,
                column.sql_type
            ))),
            None => Err(DbError::Binding(format!(
                "table {} has no column {}",
                self.name,
                column.name()
            ))),
        }
    }

    /// Quoted table name for use in statements
    pub fn quoted_name(&self) -> String {
        quote_ident(&self.name)
    }

    /// CREATE TABLE statement for this descriptor
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(Column::definition_sql).collect();
        if !self.primary_key.is_empty() {
            let pk: Vec<String> = self.primary_key.iter().map(|c| quote_ident(c)).collect();
            parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }
        format!(
            "CREATE {}TABLE IF NOT EXISTS {} ({})",
            if self.temporary { "TEMPORARY " } else { "" },
            self.quoted_name(),
            parts.join(", ")
        )
    }

    /// TRUNCATE statement for this table
    pub fn truncate_sql(&self) -> String {
        format!("TRUNCATE TABLE {}", self.quoted_name())
    }

    /// DROP statement for this table
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quoted_name())
    }
}

impl TableBuilder {
    /// Append a column
    pub fn column(mut self, column: &Column) -> Self {
        self.columns.push(column.clone());
        self
    }

    /// Add a column to the primary key
    pub fn primary_key(mut self, column: &Column) -> Self {
        self.primary_key.push(column.name().to_string());
        self
    }

    /// Create the table as session-scoped (dropped when the connection closes)
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    /// Validate and freeze the descriptor
    ///
    /// # Errors
    /// Returns `DbError::InvalidSchema` for an empty name, no columns,
    /// duplicate column names, or a primary key naming an unknown column.
    pub fn build(mut self) -> DbResult<Table> {
        if self.name.trim().is_empty() {
            return Err(DbError::InvalidSchema("table name is empty".into()));
        }
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "table {} has no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if col.name.trim().is_empty() {
                return Err(DbError::InvalidSchema(format!(
                    "table {} has a column with an empty name",
                    self.name
                )));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(DbError::InvalidSchema(format!(
                    "duplicate column {} in table {}",
                    col.name, self.name
                )));
            }
        }

        let mut pk_seen = HashSet::new();
        for pk in &self.primary_key {
            if !seen.contains(pk.as_str()) {
                return Err(DbError::InvalidSchema(format!(
                    "primary key column {} is not in table {}",
                    pk, self.name
                )));
            }
            if !pk_seen.insert(pk.as_str()) {
                return Err(DbError::InvalidSchema(format!(
                    "column {} listed twice in primary key of {}",
                    pk, self.name
                )));
            }
        }

        for col in &mut self.columns {
            if self.primary_key.contains(&col.name) {
                col.nullable = false;
            }
        }

        Ok(Table {
            name: self.name,
            columns: self.columns,
            primary_key: self.primary_key,
            temporary: self.temporary,
        })
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
