//! Common test utilities and helpers
//!
//! Shared connection setup for the integration tests. Tests skip (and pass)
//! when the test database is not reachable.

use rowshape::config::{ConnectionConfig, SslMode};
use rowshape::db::{Column, Session, Table};
use rowshape::harness::Fixture;

/// Get test database connection config
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        name: "integration-test".to_string(),
        host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("TEST_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5433),
        database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "test_db".to_string()),
        username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "test_user".to_string()),
        password: Some(
            std::env::var("TEST_DB_PASSWORD").unwrap_or_else(|_| "test_password".to_string()),
        ),
        ssl_mode: SslMode::Disable,
        connect_timeout_secs: 5,
        application_name: "rowshape-tests".to_string(),
    }
}

/// Connect, or print why not and return `None`
pub async fn connect_or_skip() -> Option<Session> {
    let config = test_config();
    match Session::connect(&config).await {
        Ok((session, _)) => Some(session),
        Err(e) => {
            eprintln!(
                "Skipping test: Database not available at {} - {}",
                config.endpoint(),
                e
            );
            None
        }
    }
}

/// Connect and create the fixture tables (temporary, so private to this session)
pub async fn fixture_session() -> Option<(Session, Fixture)> {
    let mut session = connect_or_skip().await?;
    let fixture = Fixture::new(true).unwrap();
    fixture.setup(&mut session).await.unwrap();
    Some((session, fixture))
}

/// A temporary table with a single varchar key column
#[allow(dead_code)]
pub fn keys_table(name: &str) -> (Column, Table) {
    let key = Column::varchar("KEY", 32).not_null();
    let table = Table::builder(name)
        .column(&key)
        .primary_key(&key)
        .temporary()
        .build()
        .unwrap();
    (key, table)
}
