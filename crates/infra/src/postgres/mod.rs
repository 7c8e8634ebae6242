//! Postgres-backed store (sqlx).
//!
//! [`PostgresStore`] implements the unit of work and every repository over a
//! single connection pool. Stock decrements are one conditional `UPDATE`, so
//! correctness does not depend on the isolation level: under
//! `READ COMMITTED` the second writer blocks on the row lock and re-checks the
//! condition after the first commits.
//!
//! ## Error Mapping
//!
//! | SQLx error | SQLSTATE | `StoreError` |
//! |------------|----------|--------------|
//! | Database (serialization failure) | `40001` | `WriteConflict` |
//! | Database (deadlock detected) | `40P01` | `WriteConflict` |
//! | Database (lock not available, `lock_timeout`) | `55P03` | `WriteConflict` |
//! | Database (unique / check / foreign key violation) | `23505` / `23514` / `23503` | `Constraint` |
//! | Database (other) | any other | `Backend` |
//! | PoolTimedOut | n/a | `Timeout` |
//! | ColumnDecode / Decode | n/a | `Corrupt` |
//! | Other | n/a | `Backend` |

mod consumers;
mod orders;
mod products;
mod unit_of_work;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::{DatabaseConfig, IsolationLevel};
use crate::error::StoreError;

/// Schema applied by [`apply_schema`].
pub const SCHEMA: &str = include_str!("../../migrations/0001_storefront.sql");

/// Postgres implementation of the unit of work and all repositories.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    isolation_level: IsolationLevel,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, isolation_level: IsolationLevel, lock_timeout: Duration) -> Self {
        Self {
            pool,
            isolation_level,
            lock_timeout,
        }
    }

    pub fn from_config(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self::new(pool, config.isolation_level, config.lock_timeout)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open a connection pool sized and timed per configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create tables and indexes if they do not exist yet.
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") | Some("55P03") => StoreError::WriteConflict(msg),
                Some("23505") | Some("23514") | Some("23503") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut => StoreError::Timeout(format!(
            "timed out acquiring a connection in {operation}"
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        err @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            StoreError::Corrupt(format!("failed to decode row in {operation}: {err}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error("begin", sqlx::Error::PoolTimedOut),
            StoreError::Timeout(msg) if msg.contains("begin")
        ));
    }

    #[test]
    fn other_errors_map_to_backend() {
        assert!(matches!(
            map_sqlx_error("find_product", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
        assert!(matches!(
            map_sqlx_error("find_product", sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn schema_declares_stock_bounds() {
        assert!(SCHEMA.contains("stock >= 0 AND stock <= 1000000"));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS order_items"));
    }
}
