//! Row sequences from a live database

use crate::common::{connect_or_skip, keys_table};
use futures::StreamExt;
use rowshape::sql::{Insert, Order, Select};

#[tokio::test]
async fn test_drain_yields_matching_rows_in_order() {
    let Some(mut session) = connect_or_skip().await else {
        return;
    };
    let (key, table) = keys_table("drain_keys");
    session.create_table(&table).await.unwrap();
    for k in ["c", "a", "b"] {
        session
            .execute(Insert::into(&table).value(&key, k))
            .await
            .unwrap();
    }

    let rows = session
        .query(
            Select::from(&table)
                .filter(key.ne("b"))
                .order_by(&key, Order::Asc),
        )
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    let keys: Vec<String> = rows.iter().map(|r| r.get(&key).unwrap()).collect();
    assert_eq!(keys, ["a", "c"]);
}

#[tokio::test]
async fn test_redrain_after_exhaustion_is_empty() {
    let Some(mut session) = connect_or_skip().await else {
        return;
    };
    let (key, table) = keys_table("redrain_keys");
    session.create_table(&table).await.unwrap();
    session
        .execute(Insert::into(&table).value(&key, "only"))
        .await
        .unwrap();

    let mut rows = session.query(Select::from(&table)).await.unwrap();
    assert_eq!(rows.collect_rows().await.unwrap().len(), 1);
    assert!(rows.is_exhausted());
    assert!(rows.collect_rows().await.unwrap().is_empty());
    assert!(rows.next().await.is_none());
    assert_eq!(rows.delivered(), 1);
}

#[tokio::test]
async fn test_closing_early_frees_the_session() {
    let Some(mut session) = connect_or_skip().await else {
        return;
    };
    let (key, table) = keys_table("close_keys");
    session.create_table(&table).await.unwrap();
    for k in ["a", "b", "c"] {
        session
            .execute(Insert::into(&table).value(&key, k))
            .await
            .unwrap();
    }

    {
        let mut rows = session
            .query(Select::from(&table).order_by(&key, Order::Desc))
            .await
            .unwrap();
        let first = rows.next_row().await.unwrap().unwrap();
        assert_eq!(first.get::<String>(&key).unwrap(), "c");
        rows.close();
        assert!(rows.next_row().await.is_none());
    }

    let count = session
        .execute(Insert::into(&table).value(&key, "d"))
        .await
        .unwrap();
    assert_eq!(count.get(), 1);
}

#[tokio::test]
async fn test_output_columns_follow_the_projection() {
    let Some(mut session) = connect_or_skip().await else {
        return;
    };
    let (key, table) = keys_table("projection_keys");
    session.create_table(&table).await.unwrap();

    let rows = session
        .query(Select::from(&table).columns([&key]))
        .await
        .unwrap();
    let names: Vec<&str> = rows.columns().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["KEY"]);
}
