//! Database access layer.
//!
//! [`Database`] wraps a sqlx `AnyPool`. Every call checks out one connection,
//! runs one statement (or one transaction) on it and gives it back, on every
//! exit path: the `PoolConnection` guard returns it when dropped.
//!
//! Statements use `?` placeholders, which is the native syntax of both
//! enabled backends (MySQL in production, SQLite for local runs and tests).

use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt};
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Connection, Row as _, ValueRef};
use tracing::{error, info};

use crate::config::DatabaseConfig;

use super::value::{Row, Value};

/// How long a request waits for a connection when no timeout is configured.
/// Adding it to `Instant::now()` must not overflow, so "forever" is a year.
const UNBOUNDED_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Bound on the first connection made by [`Database::connect`].
const STARTUP_CHECK: Duration = Duration::from_secs(30);

/// The process-wide connection pool.
///
/// Cheap to clone; clones share the same pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Creates the pool. Call once at startup and hand clones around.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "create database connection pool...",
        );
        sqlx::any::install_default_drivers();
        let acquire_timeout = config.acquire_timeout_secs.map_or(UNBOUNDED_WAIT, Duration::from_secs);
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(&config.url)?;

        // First connection, bounded even when acquisition is not.
        match tokio::time::timeout(STARTUP_CHECK, pool.acquire()).await {
            Ok(conn) => drop(conn?),
            Err(_) => {
                error!("database not reachable within {}s", STARTUP_CHECK.as_secs());
                pool.close().await;
                return Err(sqlx::Error::PoolTimedOut);
            }
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Runs a query and returns its rows, at most `limit` of them when given.
    pub async fn select(
        &self,
        sql: &str,
        args: &[Value],
        limit: Option<usize>,
    ) -> Result<Vec<Row>, sqlx::Error> {
        log_sql(sql, args);
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<AnyRow> = {
            let stream = bind_all(sqlx::query(sql), args).fetch(&mut *conn);
            match limit {
                Some(n) => stream.take(n).try_collect().await?,
                None => stream.try_collect().await?,
            }
        };
        info!("rows returned: {}", rows.len());

        rows.iter().map(to_row).collect()
    }

    /// Runs a mutating statement and returns the number of affected rows.
    ///
    /// With `auto_commit` off the statement runs inside its own transaction,
    /// which is rolled back when anything fails.
    pub async fn execute(
        &self,
        sql: &str,
        args: &[Value],
        auto_commit: bool,
    ) -> Result<u64, sqlx::Error> {
        log_sql(sql, args);
        let mut conn = self.pool.acquire().await?;

        if auto_commit {
            return match bind_all(sqlx::query(sql), args).execute(&mut *conn).await {
                Ok(done) => Ok(done.rows_affected()),
                Err(e) => {
                    error!("failed to execute statement: {e}");
                    Err(e)
                }
            };
        }

        let mut tx = conn.begin().await?;
        match bind_all(sqlx::query(sql), args).execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => {
                error!("failed to execute statement, rolling back: {e}");
                if let Err(rollback) = tx.rollback().await {
                    error!("rollback failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    /// Waits for checked-out connections to come back, then closes the pool.
    pub async fn close(&self) {
        info!("closing database connection pool");
        self.pool.close().await;
    }
}

fn log_sql(sql: &str, args: &[Value]) {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    info!("SQL: {sql}, args: [{}]", args.join(", "));
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    args: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for arg in args {
        query = match arg {
            Value::Null     => query.bind(None::<String>),
            Value::Bool(b)  => query.bind(*b),
            Value::Int(n)   => query.bind(*n),
            Value::Float(x) => query.bind(*x),
            Value::Text(s)  => query.bind(s.clone()),
        };
    }
    query
}

/// Converts a driver row into a column → value map.
///
/// Each column is decoded as the first type that accepts it; drivers report
/// booleans as integers, so `Int` is tried before `Bool`.
fn to_row(row: &AnyRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = if row.try_get_raw(i)?.is_null() {
            Value::Null
        } else if let Ok(n) = row.try_get::<i64, _>(i) {
            Value::Int(n)
        } else if let Ok(x) = row.try_get::<f64, _>(i) {
            Value::Float(x)
        } else if let Ok(x) = row.try_get::<f32, _>(i) {
            Value::Float(f64::from(x))
        } else if let Ok(s) = row.try_get::<String, _>(i) {
            Value::Text(s)
        } else if let Ok(b) = row.try_get::<bool, _>(i) {
            Value::Bool(b)
        } else {
            let bytes: Vec<u8> = row.try_get(i)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        };
        out.insert(column.name().to_owned(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sqlite(dir: &tempfile::TempDir, max_connections: u32) -> Database {
        sqlite_with_timeout(dir, max_connections, None).await
    }

    async fn sqlite_with_timeout(
        dir: &tempfile::TempDir,
        max_connections: u32,
        acquire_timeout_secs: Option<u64>,
    ) -> Database {
        let config = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
            max_connections,
            min_connections: 0,
            acquire_timeout_secs,
        };
        let db = Database::connect(&config).await.expect("connect");
        db.execute(
            "create table `t` (`id` integer primary key, `name` varchar(20), `score` float)",
            &[],
            true,
        )
        .await
        .expect("create table");
        db
    }

    #[tokio::test]
    async fn select_returns_rows_as_maps() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite(&dir, 2).await;
        let n = db
            .execute(
                "insert into `t` (`id`, `name`, `score`) values (?, ?, ?)",
                &[Value::Int(1), Value::from("ada"), Value::Float(1.5)],
                true,
            )
            .await
            .unwrap();
        assert_eq!(n, 1);

        let rows = db.select("select * from `t` where `id`=?", &[Value::Int(1)], None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::from("ada"));
        assert_eq!(rows[0]["score"], Value::Float(1.5));
    }

    #[tokio::test]
    async fn select_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite(&dir, 2).await;
        for id in 0..4i64 {
            db.execute("insert into `t` (`id`, `name`) values (?, ?)", &[Value::Int(id), Value::Null], true)
                .await
                .unwrap();
        }
        let rows = db.select("select `id`, `name` from `t`", &[], Some(3)).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["name"], Value::Null);
    }

    #[tokio::test]
    async fn failed_transaction_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite(&dir, 2).await;
        db.execute("insert into `t` (`id`) values (?)", &[Value::Int(7)], false).await.unwrap();

        let err = db.execute("insert into `t` (`id`) values (?)", &[Value::Int(7)], false).await;
        assert!(err.is_err());

        let rows = db.select("select count(*) as `n` from `t`", &[], None).await.unwrap();
        assert_eq!(rows[0]["n"], Value::Int(1));
    }

    #[tokio::test]
    async fn exhausted_pool_suspends_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite(&dir, 1).await;

        let held = db.pool().acquire().await.unwrap();
        let waiter = {
            let db = db.clone();
            tokio::spawn(async move { db.select("select 1 as `one`", &[], None).await })
        };

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let rows = waiter.await.unwrap().unwrap();
        assert_eq!(rows[0]["one"], Value::Int(1));
    }

    #[tokio::test]
    async fn configured_acquire_timeout_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite_with_timeout(&dir, 1, Some(1)).await;

        let _held = db.pool().acquire().await.unwrap();
        let err = db.select("select 1 as `one`", &[], None).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::PoolTimedOut), "{err:?}");
    }
}
