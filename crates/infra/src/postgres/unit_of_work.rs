use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::instrument;

use crate::error::StoreError;
use crate::unit_of_work::UnitOfWork;

use super::{PostgresStore, map_sqlx_error};

#[async_trait]
impl UnitOfWork for PostgresStore {
    type Session = Transaction<'static, Postgres>;

    #[instrument(skip(self), fields(isolation = self.isolation_level.as_sql()), err)]
    async fn begin(&self) -> Result<Self::Session, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let isolation = format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation_level.as_sql()
        );
        sqlx::query(&isolation)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation_level", e))?;

        // SET does not take bind parameters; the value is an integer we own.
        let lock_timeout = format!("SET LOCAL lock_timeout = {}", self.lock_timeout.as_millis());
        sqlx::query(&lock_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        Ok(tx)
    }

    async fn commit(&self, session: Self::Session) -> Result<(), StoreError> {
        session
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(&self, session: Self::Session) -> Result<(), StoreError> {
        session
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }
}
