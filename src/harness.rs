//! Driver regression scenarios
//!
//! Each [`Scenario`] exercises one row-count or instant-binding case against
//! the two fixture tables. [`run_all`] resets the tables before every
//! scenario and collects a [`Report`].

use crate::config::ConnectionConfig;
use crate::db::schema::{Column, Table};
use crate::db::types::instant_now;
use crate::db::{Database, Session};
use crate::error::{DbResult, Result, ScenarioError, ScenarioResult};
use crate::sql::{Insert, Order, Select, Update};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::time::{Duration, Instant};

/// The key/value and key/time tables the scenarios run against
#[derive(Debug, Clone)]
pub struct Fixture {
    pub key: Column,
    pub value: Column,
    pub time: Column,
    pub key_value: Table,
    pub key_time: Table,
}

impl Fixture {
    /// Describe the fixture tables.
    ///
    /// Temporary tables live only as long as the session that creates them.
    pub fn new(temporary: bool) -> DbResult<Self> {
        let key = Column::varchar("KEY", 32).not_null();
        let value = Column::varchar("VALUE", 32);
        let time = Column::instant("TIME");

        let mut key_value = Table::builder("key_value_table")
            .column(&key)
            .column(&value)
            .primary_key(&key);
        let mut key_time = Table::builder("key_time_table")
            .column(&key)
            .column(&time)
            .primary_key(&key);
        if temporary {
            key_value = key_value.temporary();
            key_time = key_time.temporary();
        }

        Ok(Self {
            key_value: key_value.build()?,
            key_time: key_time.build()?,
            key,
            value,
            time,
        })
    }

    /// Create both tables
    pub async fn setup<D: Database>(&self, session: &mut Session<D>) -> DbResult<()> {
        session.create_table(&self.key_value).await?;
        session.create_table(&self.key_time).await
    }

    /// Empty both tables
    pub async fn reset<D: Database>(&self, session: &mut Session<D>) -> DbResult<()> {
        session.truncate(&[&self.key_value, &self.key_time]).await
    }

    /// Drop both tables
    pub async fn teardown<D: Database>(&self, session: &mut Session<D>) -> DbResult<()> {
        session.drop_table(&self.key_value).await?;
        session.drop_table(&self.key_time).await
    }
}

/// A reproduction case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    InsertWithoutResult,
    InsertWithResult,
    UpdateWithoutResult,
    UpdateWithResult,
    SelectWhereInstant,
    InsertInstant,
    UpdateInstant,
    UpdateWhereInstant,
    InstantRoundTrip,
    RedrainExhausted,
}

impl Scenario {
    pub const ALL: [Scenario; 10] = [
        Scenario::InsertWithoutResult,
        Scenario::InsertWithResult,
        Scenario::UpdateWithoutResult,
        Scenario::UpdateWithResult,
        Scenario::SelectWhereInstant,
        Scenario::InsertInstant,
        Scenario::UpdateInstant,
        Scenario::UpdateWhereInstant,
        Scenario::InstantRoundTrip,
        Scenario::RedrainExhausted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::InsertWithoutResult => "insert without reading the row count",
            Scenario::InsertWithResult => "insert reading the row count",
            Scenario::UpdateWithoutResult => "update without reading the row count",
            Scenario::UpdateWithResult => "update reading the row count",
            Scenario::SelectWhereInstant => "select where instant is earlier than now",
            Scenario::InsertInstant => "insert a row with an instant",
            Scenario::UpdateInstant => "update an instant",
            Scenario::UpdateWhereInstant => "update where instant equals",
            Scenario::InstantRoundTrip => "instant round trip",
            Scenario::RedrainExhausted => "re-drain an exhausted row sequence",
        }
    }

    /// Look up scenarios whose name contains `filter` (case-insensitive)
    pub fn matching(filter: &str) -> Vec<Scenario> {
        let filter = filter.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|s| s.name().contains(&filter))
            .collect()
    }

    /// Run against tables that already exist and are empty
    pub async fn run<D: Database>(
        self,
        session: &mut Session<D>,
        fx: &Fixture,
    ) -> ScenarioResult<()> {
        match self {
            Scenario::InsertWithoutResult => {
                session
                    .execute(
                        Insert::into(&fx.key_value)
                            .value(&fx.key, "one")
                            .value(&fx.value, "1"),
                    )
                    .await?;

                let rows = session
                    .query(Select::from(&fx.key_value).columns([&fx.key, &fx.value]))
                    .await?
                    .collect_rows()
                    .await?;
                ensure_eq(rows.len(), 1, "rows after insert")?;
                ensure_eq(rows[0].get::<String>(&fx.key)?, "one".to_string(), "key")?;
                ensure_eq(
                    rows[0].get::<Option<String>>(&fx.value)?,
                    Some("1".to_string()),
                    "value",
                )
            }
            Scenario::InsertWithResult => {
                let count = session
                    .execute(
                        Insert::into(&fx.key_value)
                            .value(&fx.key, "one")
                            .value(&fx.value, "1"),
                    )
                    .await?;
                ensure_eq(count.get(), 1, "insert row count")
            }
            Scenario::UpdateWithoutResult => {
                session
                    .execute(
                        Update::table(&fx.key_value)
                            .set(&fx.value, "1")
                            .filter(fx.key.eq("one")),
                    )
                    .await?;
                Ok(())
            }
            Scenario::UpdateWithResult => {
                let count = session
                    .execute(
                        Update::table(&fx.key_value)
                            .set(&fx.value, "1")
                            .filter(fx.key.eq("one")),
                    )
                    .await?;
                ensure_eq(count.get(), 0, "update row count")
            }
            Scenario::SelectWhereInstant => {
                let rows = session
                    .query(
                        Select::from(&fx.key_time)
                            .columns([&fx.key])
                            .filter(fx.time.lt(instant_now())),
                    )
                    .await?
                    .collect_rows()
                    .await?;
                ensure_eq(rows.len(), 0, "rows in empty table")
            }
            Scenario::InsertInstant => {
                let count = session
                    .execute(
                        Insert::into(&fx.key_time)
                            .value(&fx.key, "now")
                            .value(&fx.time, instant_now()),
                    )
                    .await?;
                ensure_eq(count.get(), 1, "insert row count")
            }
            Scenario::UpdateInstant => {
                let count = session
                    .execute(
                        Update::table(&fx.key_time)
                            .set(&fx.time, instant_now())
                            .filter(fx.key.eq("now")),
                    )
                    .await?;
                ensure_eq(count.get(), 0, "update row count")
            }
            Scenario::UpdateWhereInstant => {
                let count = session
                    .execute(
                        Update::table(&fx.key_time)
                            .set(&fx.key, "foo")
                            .filter(fx.time.eq(instant_now())),
                    )
                    .await?;
                ensure_eq(count.get(), 0, "update row count")
            }
            Scenario::InstantRoundTrip => instant_round_trip(session, fx).await,
            Scenario::RedrainExhausted => {
                for k in ["a", "b"] {
                    session
                        .execute(Insert::into(&fx.key_value).value(&fx.key, k))
                        .await?;
                }

                let mut rows = session
                    .query(Select::from(&fx.key_value).order_by(&fx.key, Order::Asc))
                    .await?;
                let first = rows.collect_rows().await?;
                let second = rows.collect_rows().await?;
                ensure_eq(first.len(), 2, "first drain")?;
                ensure_eq(second.len(), 0, "second drain")
            }
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

async fn instant_round_trip<D: Database>(
    session: &mut Session<D>,
    fx: &Fixture,
) -> ScenarioResult<()> {
    let earlier = instant_now() - ChronoDuration::milliseconds(1500);
    session
        .execute(
            Insert::into(&fx.key_time)
                .value(&fx.key, "then")
                .value(&fx.time, earlier),
        )
        .await?;

    let read_back = session
        .query(Select::from(&fx.key_time).filter(fx.key.eq("then")))
        .await?
        .collect_rows()
        .await?;
    ensure_eq(read_back.len(), 1, "rows for key")?;
    ensure_eq(
        read_back[0].get::<Option<DateTime<Utc>>>(&fx.time)?,
        Some(earlier),
        "instant read back",
    )?;

    let equal = session
        .query(Select::from(&fx.key_time).filter(fx.time.eq(earlier)))
        .await?
        .collect_rows()
        .await?;
    ensure_eq(equal.len(), 1, "rows where time = written instant")?;

    let before_now = session
        .query(Select::from(&fx.key_time).filter(fx.time.lt(instant_now())))
        .await?
        .collect_rows()
        .await?;
    ensure_eq(before_now.len(), 1, "rows where time < now")?;

    let before_earlier = session
        .query(Select::from(&fx.key_time).filter(fx.time.lt(earlier)))
        .await?
        .collect_rows()
        .await?;
    ensure_eq(before_earlier.len(), 0, "rows where time < written instant")
}

fn ensure_eq<T: PartialEq + fmt::Debug>(actual: T, expected: T, what: &str) -> ScenarioResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ScenarioError::Assertion(format!(
            "{}: expected {:?}, got {:?}",
            what, expected, actual
        )))
    }
}

/// Outcome of one scenario
#[derive(Debug)]
pub struct Outcome {
    pub scenario: Scenario,
    pub result: ScenarioResult<()>,
    pub elapsed: Duration,
}

/// Outcomes of a suite run, in run order
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(()) => writeln!(
                    f,
                    "PASS  {} ({} ms)",
                    outcome.scenario,
                    outcome.elapsed.as_millis()
                )?,
                Err(e) => writeln!(f, "FAIL  {}: {}", outcome.scenario, e)?,
            }
        }
        write!(f, "{} passed, {} failed", self.passed(), self.failed())
    }
}

/// Run `scenarios` in order, resetting the fixture tables before each.
///
/// A failing reset is recorded against the scenario it preceded; the
/// remaining scenarios still run.
pub async fn run_all<D: Database>(
    session: &mut Session<D>,
    fixture: &Fixture,
    scenarios: &[Scenario],
) -> Report {
    let mut report = Report::default();

    for &scenario in scenarios {
        let started = Instant::now();
        let result = match fixture.reset(session).await {
            Ok(()) => scenario.run(session, fixture).await,
            Err(e) => Err(e.into()),
        };
        let elapsed = started.elapsed();

        match &result {
            Ok(()) => tracing::info!(scenario = %scenario, ms = elapsed.as_millis() as u64, "passed"),
            Err(e) => tracing::warn!(scenario = %scenario, error = %e, "failed"),
        }
        report.outcomes.push(Outcome {
            scenario,
            result,
            elapsed,
        });
    }

    report
}

/// Connect, create the fixture tables and run `scenarios`.
///
/// Fixture tables are temporary, so nothing outlives the connection.
///
/// # Errors
/// Fails only if the connection or the fixture setup fails; scenario
/// failures are recorded in the report.
pub async fn run_suite(config: &ConnectionConfig, scenarios: &[Scenario]) -> Result<Report> {
    let (mut session, mut conn_err_rx) = Session::connect(config).await?;
    let fixture = Fixture::new(true)?;
    fixture.setup(&mut session).await?;

    let report = run_all(&mut session, &fixture, scenarios).await;

    if let Err(e) = fixture.teardown(&mut session).await {
        tracing::warn!(error = %e, "dropping fixture tables failed");
    }
    if let Ok(msg) = conn_err_rx.try_recv() {
        tracing::warn!(%msg, "connection lost during run");
    }
    Ok(report)
}
