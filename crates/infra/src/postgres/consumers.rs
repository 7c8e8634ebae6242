use async_trait::async_trait;
use sqlx::Row;
use tracing::instrument;

use storefront_core::CustomerId;
use storefront_orders::CustomerLocation;

use crate::error::StoreError;
use crate::repositories::ConsumerDirectory;

use super::{PostgresStore, map_sqlx_error};

impl PostgresStore {
    /// Insert or update consumer reference data (seeding and tests).
    #[instrument(skip(self, name), fields(customer_id = %customer_id, location = %location), err)]
    pub async fn upsert_consumer(
        &self,
        customer_id: CustomerId,
        name: &str,
        location: CustomerLocation,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO consumers (id, name, location)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, location = EXCLUDED.location
            "#,
        )
        .bind(customer_id.as_uuid())
        .bind(name)
        .bind(location.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_consumer", e))?;
        Ok(())
    }
}

#[async_trait]
impl ConsumerDirectory for PostgresStore {
    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    async fn find_location(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerLocation>, StoreError> {
        let row = sqlx::query("SELECT location FROM consumers WHERE id = $1")
            .bind(customer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_consumer", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let location: String = row
            .try_get("location")
            .map_err(|e| map_sqlx_error("decode_consumer", e))?;
        location
            .parse::<CustomerLocation>()
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("consumer {customer_id}: {e}")))
    }
}
