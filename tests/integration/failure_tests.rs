//! Failure classification against a live database

use crate::common::{fixture_session, keys_table, test_config};
use rowshape::db::{Column, Session};
use rowshape::harness::{self, Scenario};
use rowshape::sql::{Insert, Select};
use rowshape::{DbError, RowshapeError};
use std::time::Duration;

#[tokio::test]
async fn test_unreachable_backend_is_unavailable() {
    let mut config = test_config();
    config.host = "127.0.0.1".to_string();
    config.port = 1;
    config.connect_timeout_secs = 2;

    let err = match Session::connect(&config).await {
        Ok(_) => panic!("nothing should listen on port 1"),
        Err(e) => e,
    };
    assert!(err.is_unavailable(), "got {:?}", err);
}

#[tokio::test]
async fn test_binding_errors_leave_the_session_usable() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };

    let too_long = "x".repeat(33);
    let err = session
        .execute(Insert::into(&fx.key_value).value(&fx.key, too_long.as_str()))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)));

    let err = session
        .execute(Insert::into(&fx.key_value).value(&fx.value, "no key"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)));

    let count = session
        .execute(Insert::into(&fx.key_value).value(&fx.key, "ok"))
        .await
        .unwrap();
    assert_eq!(count.get(), 1);
}

#[tokio::test]
async fn test_table_missing_on_server_is_query_failed() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };
    session.drop_table(&fx.key_value).await.unwrap();

    let err = session
        .execute(Insert::into(&fx.key_value).value(&fx.key, "gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::QueryFailed(_)), "got {:?}", err);

    let rows = session
        .query(Select::from(&fx.key_time))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_declared_type_disagreeing_with_server_is_shape_mismatch() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };
    // Same table name, but TIME declared as text
    let key = Column::varchar("KEY", 32).not_null();
    let time_as_text = Column::varchar("TIME", 32);
    let wrong = rowshape::db::Table::builder(fx.key_time.name())
        .column(&key)
        .column(&time_as_text)
        .primary_key(&key)
        .temporary()
        .build()
        .unwrap();

    let err = session
        .query(Select::from(&wrong).columns([&time_as_text]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ResultShapeMismatch(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_run_suite_against_unreachable_backend() {
    let mut config = test_config();
    config.host = "127.0.0.1".to_string();
    config.port = 1;
    config.connect_timeout_secs = 2;

    let err = harness::run_suite(&config, &Scenario::ALL)
        .await
        .unwrap_err();
    assert!(
        matches!(err, RowshapeError::Database(DbError::BackendUnavailable(_))),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_literal_longer_than_column_matches_nothing() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };
    session
        .execute(Insert::into(&fx.key_value).value(&fx.key, "one"))
        .await
        .unwrap();

    let rows = session
        .query(Select::from(&fx.key_value).filter(fx.key.eq("k".repeat(40))))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_terminated_backend_during_query() {
    let mut config = test_config();
    config.application_name = format!("rowshape-terminate-{}", std::process::id());
    let mut session = match Session::connect(&config).await {
        Ok((session, _)) => session,
        Err(e) => {
            eprintln!("Skipping test: Database not available - {}", e);
            return;
        }
    };
    let (admin, connection) =
        tokio_postgres::connect(&config.connection_string_with_password(), tokio_postgres::NoTls)
            .await
            .unwrap();
    tokio::spawn(connection);

    let (key, table) = keys_table("terminate_keys");
    session.create_table(&table).await.unwrap();
    for i in 0..2000 {
        let k = format!("{:0>32}", i);
        session
            .execute(Insert::into(&table).value(&key, k.as_str()))
            .await
            .unwrap();
    }

    let mut rows = session.query(Select::from(&table)).await.unwrap();
    let first = rows.next_row().await.unwrap().unwrap();

    admin
        .execute(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
             WHERE application_name = $1 AND pid <> pg_backend_pid()",
            &[&config.application_name],
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Rows may already be buffered client-side; otherwise the loss
    // arrives as the next item and ends the sequence.
    let mut failure = None;
    while let Some(next) = rows.next_row().await {
        if let Err(e) = next {
            failure = Some(e);
            break;
        }
    }
    assert!(rows.is_exhausted());
    assert!(rows.next_row().await.is_none());
    assert_eq!(first.get::<String>(&key).unwrap().len(), 32);
    drop(rows);

    let failure = match failure {
        Some(e) => e,
        None => session
            .execute(Insert::into(&table).value(&key, "after"))
            .await
            .unwrap_err(),
    };
    assert!(failure.is_unavailable(), "got {:?}", failure);
}
