//! Database adapters (connection pool, error mapping).

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Open a connection pool for `database_url`.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Human-readable description of a SQLx failure in `operation`.
///
/// Repository error enums wrap this string; none of the callers branch on
/// individual Postgres error codes.
pub(crate) fn describe_sqlx_error(operation: &str, err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("database error in {operation} ({code}): {}", db_err.message()),
            None => format!("database error in {operation}: {}", db_err.message()),
        },
        sqlx::Error::PoolClosed => format!("connection pool closed in {operation}"),
        sqlx::Error::PoolTimedOut => format!("timed out acquiring a connection in {operation}"),
        other => format!("sqlx error in {operation}: {other}"),
    }
}
