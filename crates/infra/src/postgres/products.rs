use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use storefront_core::{Money, ProductId};
use storefront_inventory::{Product, ProductCategory};

use crate::error::StoreError;
use crate::repositories::ProductRepository;
use crate::unit_of_work::TransactionContext;

use super::{PostgresStore, map_sqlx_error};

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, description, price, stock, category
    FROM products
    WHERE id = $1
"#;

#[async_trait]
impl ProductRepository for PostgresStore {
    type Session = Transaction<'static, Postgres>;

    #[instrument(skip(self, ctx), fields(product_id = %id, in_transaction = ctx.is_active()), err)]
    async fn find_by_id(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        id: ProductId,
    ) -> Result<Option<Product>, StoreError> {
        let row = match ctx.session_if_available() {
            Some(tx) => {
                sqlx::query(SELECT_PRODUCT)
                    .bind(id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await
            }
            None => {
                sqlx::query(SELECT_PRODUCT)
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, ctx, product), fields(product_id = %product.id_typed()), err)]
    async fn create(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        product: &Product,
    ) -> Result<(), StoreError> {
        let tx = ctx.session()?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.description())
        .bind(product.price().amount())
        .bind(product.stock())
        .bind(product.category().as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        Ok(())
    }

    #[instrument(
        skip(self, ctx),
        fields(product_id = %id, new_stock = tracing::field::Empty),
        err
    )]
    async fn update_stock(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        id: ProductId,
        change: i64,
    ) -> Result<i64, StoreError> {
        let tx = ctx.session()?;
        if change == 0 {
            return Err(StoreError::InvalidStockChange(format!(
                "stock change for product {id} cannot be zero"
            )));
        }

        let new_stock = if change > 0 {
            let row = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock + $2, updated_at = NOW()
                WHERE id = $1
                RETURNING stock
                "#,
            )
            .bind(id.as_uuid())
            .bind(change)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("increment_stock", e))?;

            match row {
                Some(row) => stock_from_row(&row)?,
                None => return Err(StoreError::ProductNotFound(id)),
            }
        } else {
            let requested = change.saturating_neg();

            // Single conditional write: decrement only when enough stock is on hand.
            let row = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                RETURNING stock
                "#,
            )
            .bind(id.as_uuid())
            .bind(requested)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

            match row {
                Some(row) => stock_from_row(&row)?,
                None => {
                    // No match: tell a missing product from a failed condition.
                    let current = sqlx::query("SELECT stock FROM products WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(|e| map_sqlx_error("read_stock", e))?;

                    return match current {
                        Some(row) => Err(StoreError::StockConditionFailed {
                            product_id: id,
                            available: stock_from_row(&row)?,
                            requested,
                        }),
                        None => Err(StoreError::ProductNotFound(id)),
                    };
                }
            }
        };

        Span::current().record("new_stock", new_stock);
        Ok(new_stock)
    }
}

fn stock_from_row(row: &PgRow) -> Result<i64, StoreError> {
    row.try_get::<i64, _>("stock")
        .map_err(|e| map_sqlx_error("decode_stock", e))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let decode = |e| map_sqlx_error("decode_product", e);

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let description: String = row.try_get("description").map_err(decode)?;
    let price: Decimal = row.try_get("price").map_err(decode)?;
    let stock: i64 = row.try_get("stock").map_err(decode)?;
    let category: String = row.try_get("category").map_err(decode)?;

    let price = Money::new(price)
        .map_err(|e| StoreError::Corrupt(format!("product {id} has an invalid price: {e}")))?;
    let category = category
        .parse::<ProductCategory>()
        .map_err(|e| StoreError::Corrupt(format!("product {id}: {e}")))?;

    Ok(Product::load(
        ProductId::from_uuid(id),
        name,
        description,
        price,
        stock,
        category,
    ))
}
