//! Instant binding against a live database

use crate::common::fixture_session;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rowshape::DbError;
use rowshape::db::instant_now;
use rowshape::sql::{Insert, Select, Update};

#[tokio::test]
async fn test_select_where_time_before_now_on_empty_table() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };

    let rows = session
        .query(
            Select::from(&fx.key_time)
                .columns([&fx.key])
                .filter(fx.time.lt(instant_now())),
        )
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_instant_round_trip_is_exact() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };
    let written = Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap()
        + Duration::microseconds(535_897);

    session
        .execute(
            Insert::into(&fx.key_time)
                .value(&fx.key, "pi")
                .value(&fx.time, written),
        )
        .await
        .unwrap();

    let rows = session
        .query(Select::from(&fx.key_time).filter(fx.key.eq("pi")))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get::<Option<DateTime<Utc>>>(&fx.time).unwrap(),
        Some(written)
    );
}

#[tokio::test]
async fn test_time_predicates_against_an_earlier_row() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };
    let earlier = instant_now() - Duration::seconds(2);

    session
        .execute(
            Insert::into(&fx.key_time)
                .value(&fx.key, "then")
                .value(&fx.time, earlier),
        )
        .await
        .unwrap();

    let before_now = session
        .query(Select::from(&fx.key_time).filter(fx.time.lt(instant_now())))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(before_now.len(), 1);

    let before_earlier = session
        .query(Select::from(&fx.key_time).filter(fx.time.lt(earlier)))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert!(before_earlier.is_empty());

    let equal = session
        .query(Select::from(&fx.key_time).filter(fx.time.eq(earlier)))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(equal.len(), 1);
}

#[tokio::test]
async fn test_update_instant_and_update_where_instant() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };

    let count = session
        .execute(
            Update::table(&fx.key_time)
                .set(&fx.time, instant_now())
                .filter(fx.key.eq("now")),
        )
        .await
        .unwrap();
    assert_eq!(count.get(), 0);

    let stamp = instant_now();
    session
        .execute(
            Insert::into(&fx.key_time)
                .value(&fx.key, "now")
                .value(&fx.time, stamp),
        )
        .await
        .unwrap();

    let count = session
        .execute(
            Update::table(&fx.key_time)
                .set(&fx.key, "foo")
                .filter(fx.time.eq(stamp)),
        )
        .await
        .unwrap();
    assert_eq!(count.get(), 1);
}

#[tokio::test]
async fn test_sub_microsecond_instant_is_rejected_before_sending() {
    let Some((mut session, fx)) = fixture_session().await else {
        return;
    };
    let precise = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + Duration::nanoseconds(1);

    let err = session
        .execute(
            Insert::into(&fx.key_time)
                .value(&fx.key, "ns")
                .value(&fx.time, precise),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)));

    let rows = session
        .query(Select::from(&fx.key_time))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert!(rows.is_empty());
}
