//! PostgreSQL database provider
//!
//! Concrete implementation using tokio-postgres.

use crate::config::ConnectionConfig;
use crate::config::connections::SslMode;
use crate::db::provider::{Database, RowStream};
use crate::db::schema::Column;
use crate::db::types::{Row, SqlType, Value};
use crate::error::{DbError, DbResult};
use crate::sql::{BoundStatement, Param};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_postgres::Client;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{ToSql, Type, WrongType};

/// PostgreSQL database provider
pub struct PostgresProvider {
    /// The tokio-postgres client
    client: Client,
}

impl PostgresProvider {
    /// Connect to a PostgreSQL database.
    ///
    /// Returns the provider and a receiver that fires if the background
    /// connection is lost (e.g. server restart, idle timeout).
    ///
    /// # Errors
    /// Returns `DbError::BackendUnavailable` if the connection cannot be
    /// established.
    pub async fn connect(
        config: &ConnectionConfig,
    ) -> DbResult<(Self, mpsc::UnboundedReceiver<String>)> {
        let conn_string = config.connection_string_with_password();
        let (conn_err_tx, conn_err_rx) = mpsc::unbounded_channel();
        let unavailable = |e: tokio_postgres::Error| {
            DbError::BackendUnavailable(format!("{}: {}", config.endpoint(), e))
        };

        tracing::debug!(endpoint = %config.endpoint(), ssl_mode = ?config.ssl_mode, "connecting");

        let client = match config.ssl_mode {
            SslMode::Disable => {
                let (client, connection) =
                    tokio_postgres::connect(&conn_string, tokio_postgres::NoTls)
                        .await
                        .map_err(unavailable)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("Connection lost: {}", e);
                        let _ = conn_err_tx.send(format!("Connection lost: {}", e));
                    }
                });
                client
            }
            SslMode::Prefer | SslMode::Require => {
                let tls_config = make_tls_config();
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
                let (client, connection) = tokio_postgres::connect(&conn_string, tls)
                    .await
                    .map_err(unavailable)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("Connection lost: {}", e);
                        let _ = conn_err_tx.send(format!("Connection lost: {}", e));
                    }
                });
                client
            }
        };

        tracing::info!(endpoint = %config.endpoint(), "connected");

        Ok((Self { client }, conn_err_rx))
    }

    async fn prepare(&self, statement: &BoundStatement) -> DbResult<tokio_postgres::Statement> {
        let types: Vec<Type> = statement
            .params
            .iter()
            .map(|p| sql_type_to_pg(p.sql_type))
            .collect();
        self.client
            .prepare_typed(&statement.sql, &types)
            .await
            .map_err(classify_error)
    }
}

impl Database for PostgresProvider {
    async fn execute(&mut self, statement: &BoundStatement) -> DbResult<u64> {
        let stmt = self.prepare(statement).await?;

        if !stmt.columns().is_empty() {
            return Err(DbError::ResultShapeMismatch(format!(
                "{} statement returns {} column(s); it cannot be read as a row count",
                statement.kind,
                stmt.columns().len()
            )));
        }

        let params = to_sql_params(&statement.params);
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.client
            .execute(&stmt, &refs)
            .await
            .map_err(classify_error)
    }

    async fn query(&mut self, statement: &BoundStatement) -> DbResult<RowStream<'_>> {
        let stmt = self.prepare(statement).await?;
        check_output_shape(stmt.columns(), &statement.output)?;

        let params = to_sql_params(&statement.params);
        let rows = self
            .client
            .query_raw(
                &stmt,
                params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)),
            )
            .await
            .map_err(classify_error)?;

        let output = Arc::clone(&statement.output);
        Ok(rows
            .map(move |row| {
                let row = row.map_err(classify_error)?;
                decode_row(&row, &output)
            })
            .boxed())
    }

    async fn batch_execute(&mut self, sql: &str) -> DbResult<()> {
        self.client.batch_execute(sql).await.map_err(classify_error)
    }

    fn is_connected(&self) -> bool {
        !self.client.is_closed()
    }
}

/// Map a declared column type to the PostgreSQL parameter type
fn sql_type_to_pg(sql_type: SqlType) -> Type {
    match sql_type {
        SqlType::Varchar(_) => Type::VARCHAR,
        SqlType::Instant => Type::TIMESTAMPTZ,
    }
}

/// Whether a described result column can be decoded as `sql_type`
fn pg_type_matches(sql_type: SqlType, pg_type: &Type) -> bool {
    match sql_type {
        SqlType::Varchar(_) => matches!(
            *pg_type,
            Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME
        ),
        SqlType::Instant => *pg_type == Type::TIMESTAMPTZ,
    }
}

/// Compare the backend's description of a statement with the columns the
/// caller expects to read.
fn check_output_shape(described: &[tokio_postgres::Column], expected: &[Column]) -> DbResult<()> {
    if described.is_empty() {
        return Err(DbError::ResultShapeMismatch(
            "statement produces a row count, not rows".to_string(),
        ));
    }
    if described.len() != expected.len() {
        return Err(DbError::ResultShapeMismatch(format!(
            "backend returns {} column(s), expected {}",
            described.len(),
            expected.len()
        )));
    }
    for (pg_col, col) in described.iter().zip(expected) {
        if !pg_type_matches(col.sql_type(), pg_col.type_()) {
            return Err(DbError::ResultShapeMismatch(format!(
                "column {} is {} in the backend, expected {}",
                pg_col.name(),
                pg_col.type_().name(),
                col.sql_type()
            )));
        }
    }
    Ok(())
}

/// Convert bound values to driver parameters by their declared column type.
///
/// NULL needs a typed `None` so the driver's type check accepts it.
fn to_sql_params(params: &[Param]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql + Sync + Send> {
            match (&p.value, p.sql_type) {
                (Value::Text(s), _) => Box::new(s.clone()),
                (Value::Instant(t), _) => Box::new(*t),
                (Value::Null, SqlType::Varchar(_)) => Box::new(None::<String>),
                (Value::Null, SqlType::Instant) => Box::new(None::<DateTime<Utc>>),
            }
        })
        .collect()
}

/// Decode a tokio_postgres Row using the expected column descriptors.
fn decode_row(row: &tokio_postgres::Row, output: &Arc<[Column]>) -> DbResult<Row> {
    let mut values = Vec::with_capacity(output.len());
    for (idx, column) in output.iter().enumerate() {
        let value = match column.sql_type() {
            SqlType::Varchar(_) => row.try_get::<_, Option<String>>(idx).map(Value::from),
            SqlType::Instant => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)
                .map(Value::from),
        }
        .map_err(|e| {
            DbError::ResultShapeMismatch(format!("column {}: {}", column.name(), e))
        })?;
        values.push(value);
    }
    Ok(Row::new(Arc::clone(output), values))
}

/// Sort a driver error into the façade's taxonomy.
fn classify_error(e: tokio_postgres::Error) -> DbError {
    if e.is_closed() {
        return DbError::BackendUnavailable(e.to_string());
    }

    if let Some(db_err) = e.as_db_error() {
        let code = db_err.code();
        let class = &code.code()[..2];
        return if class == "08"
            || *code == SqlState::ADMIN_SHUTDOWN
            || *code == SqlState::CRASH_SHUTDOWN
            || *code == SqlState::CANNOT_CONNECT_NOW
        {
            DbError::BackendUnavailable(db_err.to_string())
        } else if class == "22"
            || *code == SqlState::DATATYPE_MISMATCH
            || *code == SqlState::NOT_NULL_VIOLATION
        {
            DbError::Binding(db_err.to_string())
        } else {
            DbError::QueryFailed(db_err.to_string())
        };
    }

    let wrong_type = std::error::Error::source(&e)
        .is_some_and(|source| source.downcast_ref::<WrongType>().is_some());
    if wrong_type || e.to_string().starts_with("error serializing parameter") {
        return DbError::Binding(e.to_string());
    }

    DbError::BackendUnavailable(e.to_string())
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        tracing::warn!("no native root certificates found, using bundled Mozilla roots");
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}
