//! Database executor
//!
//! The single choke point that runs built statements against a connection:
//! one-shot execute/query round trips and transactional batch execution.
//! The dynamic value bridge between [`Value`] and the driver lives here,
//! private to the executor.

use std::sync::Once;
use std::time::Duration;

use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow, install_default_drivers};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Executor, Row, Statement, TypeInfo};
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::error::{BatchError, Result, RowMapError};
use crate::sql::dialect::Dialect;
use crate::types::Value;

/// How many times a failed batch attempts to roll back
const ROLLBACK_ATTEMPTS: u32 = 5;
/// Fixed delay between rollback attempts
const ROLLBACK_DELAY: Duration = Duration::from_secs(2);

static DRIVERS: Once = Once::new();

/// A connection pool plus the dialect its statements are rendered for.
///
/// The pool is the single connection/transaction abstraction: the concrete
/// driver is selected by the connection URL scheme, which also fixes the
/// dialect for every statement built through this handle.
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
}

impl Database {
    /// Connect with default pool settings
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(&DatabaseConfig::builder(url).build()).await
    }

    /// Connect with explicit pool settings
    pub async fn connect_with(config: &DatabaseConfig) -> Result<Self> {
        DRIVERS.call_once(install_default_drivers);
        let dialect = Dialect::from_url(&config.url)?;
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| RowMapError::connection(format!("database connection failed: {e}")))?;
        Ok(Self { pool, dialect })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Run a single statement and return the number of rows affected
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
        debug!(sql, params = args.len(), "execute");
        let mut query = sqlx::query(sql);
        for value in args {
            query = bind_value(query, value);
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    /// Run a query and materialize every row through the value bridge
    pub async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Vec<Value>>> {
        debug!(sql, params = args.len(), "query");
        let mut query = sqlx::query(sql);
        for value in args {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    /// Run one statement once per record, inside a single transaction.
    ///
    /// The statement is prepared once; every record binds its own argument
    /// list. The first failing record aborts the batch: rollback is retried
    /// up to [`ROLLBACK_ATTEMPTS`] times, and the resulting [`BatchError`]
    /// carries the original failure alongside the cleanup outcome.
    pub async fn execute_many(
        &self,
        sql: &str,
        records: &[Vec<Value>],
    ) -> std::result::Result<(), BatchError> {
        if records.is_empty() {
            return Ok(());
        }
        debug!(sql, rows = records.len(), "execute_many");

        let mut conn = self.pool.acquire().await.map_err(|e| {
            BatchError::new(RowMapError::transaction(format!(
                "failed to begin transaction: {e}"
            )))
        })?;

        // A begin failure aborts outright; there is nothing to roll back yet.
        if let Err(e) = sqlx::query("BEGIN").execute(&mut *conn).await {
            return Err(BatchError::new(RowMapError::transaction(format!(
                "failed to begin transaction: {e}"
            ))));
        }

        let statement = match (&mut *conn).prepare(sql).await {
            Ok(statement) => statement,
            Err(e) => {
                let cleanup = sqlx::query("ROLLBACK")
                    .execute(&mut *conn)
                    .await
                    .err()
                    .map(|re| RowMapError::transaction(format!("failed to roll back: {re}")));
                return Err(BatchError::with_cleanup(
                    RowMapError::transaction(format!("failed to prepare statement: {e}")),
                    cleanup,
                ));
            }
        };

        for record in records {
            let mut query = statement.query();
            for value in record {
                query = bind_value(query, value);
            }
            if let Err(e) = query.execute(&mut *conn).await {
                let cleanup = rollback_with_retry(&mut conn).await.err();
                return Err(BatchError::with_cleanup(RowMapError::Execution(e), cleanup));
            }
        }

        sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                BatchError::new(RowMapError::transaction(format!(
                    "failed to commit transaction: {e}"
                )))
            })?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn rollback_with_retry(conn: &mut PoolConnection<Any>) -> Result<()> {
    let mut attempt = 1;
    loop {
        match sqlx::query("ROLLBACK").execute(&mut **conn).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                warn!(attempt, error = %e, "rollback failed");
                if attempt == ROLLBACK_ATTEMPTS {
                    return Err(RowMapError::transaction(format!(
                        "failed to roll back after {attempt} attempts: {e}"
                    )));
                }
                attempt += 1;
                tokio::time::sleep(ROLLBACK_DELAY).await;
            }
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Blob(b) => query.bind(b.as_slice()),
    }
}

fn decode_row(row: &AnyRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|index| decode_column(row, index)).collect()
}

/// Decode one column keyed on the driver's reported type. Unrecognized
/// types fall back to text, matching how richer values travel.
fn decode_column(row: &AnyRow, index: usize) -> Result<Value> {
    let type_name = row.column(index).type_info().name().to_ascii_uppercase();
    let value = match type_name.as_str() {
        "NULL" => Value::Null,
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)?
            .map_or(Value::Null, Value::Bool),
        "SMALLINT" | "INT2" | "INT" | "INT4" | "INTEGER" | "BIGINT" | "INT8" => row
            .try_get::<Option<i64>, _>(index)?
            .map_or(Value::Null, Value::Int),
        "REAL" | "FLOAT4" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)?
            .map_or(Value::Null, Value::Float),
        "BLOB" | "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)?
            .map_or(Value::Null, Value::Blob),
        _ => row
            .try_get::<Option<String>, _>(index)?
            .map_or(Value::Null, Value::Text),
    };
    Ok(value)
}
