use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use storefront_core::{CustomerId, Money, OrderId, ProductId};
use storefront_orders::{Order, OrderItem, PriceBreakdown};

use crate::error::StoreError;
use crate::repositories::OrderRepository;
use crate::unit_of_work::TransactionContext;

use super::{PostgresStore, map_sqlx_error};

const SELECT_ORDER: &str = r#"
    SELECT id, customer_id, total, original_total, regional_adjustment,
           tax_amount, tax_rate, discount_applied, created_at
    FROM orders
    WHERE id = $1
"#;

const SELECT_ORDER_ITEMS: &str = r#"
    SELECT product_id, quantity, price
    FROM order_items
    WHERE order_id = $1
    ORDER BY line_no
"#;

#[async_trait]
impl OrderRepository for PostgresStore {
    type Session = Transaction<'static, Postgres>;

    #[instrument(
        skip(self, ctx, order),
        fields(order_id = %order.id_typed(), lines = order.items().len()),
        err
    )]
    async fn create(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        order: &Order,
    ) -> Result<(), StoreError> {
        let tx = ctx.session()?;
        let pricing = order.pricing();

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, total, original_total, regional_adjustment,
                tax_amount, tax_rate, discount_applied, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(pricing.total.amount())
        .bind(pricing.original_total.amount())
        .bind(pricing.regional_adjustment)
        .bind(pricing.tax_amount.amount())
        .bind(pricing.tax_rate)
        .bind(pricing.discount_applied.as_str())
        .bind(order.created_at())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for (line_no, item) in order.items().iter().enumerate() {
            let line_no = i32::try_from(line_no)
                .map_err(|_| StoreError::Constraint("too many order lines".to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id_typed().as_uuid())
            .bind(line_no)
            .bind(item.product_id().as_uuid())
            .bind(item.quantity())
            .bind(item.price().amount())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        Ok(())
    }

    #[instrument(skip(self, ctx), fields(order_id = %id, in_transaction = ctx.is_active()), err)]
    async fn find_by_id(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        let (header, lines) = match ctx.session_if_available() {
            Some(tx) => {
                let header = sqlx::query(SELECT_ORDER)
                    .bind(id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("find_order", e))?;
                let lines = sqlx::query(SELECT_ORDER_ITEMS)
                    .bind(id.as_uuid())
                    .fetch_all(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("find_order_items", e))?;
                (header, lines)
            }
            None => {
                let header = sqlx::query(SELECT_ORDER)
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("find_order", e))?;
                let lines = sqlx::query(SELECT_ORDER_ITEMS)
                    .bind(id.as_uuid())
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("find_order_items", e))?;
                (header, lines)
            }
        };

        let Some(header) = header else {
            return Ok(None);
        };

        let items = lines
            .iter()
            .map(|row| item_from_row(id, row))
            .collect::<Result<Vec<_>, _>>()?;

        order_from_row(&header, items).map(Some)
    }
}

fn corrupt(order_id: impl core::fmt::Display, e: impl core::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("order {order_id}: {e}"))
}

fn item_from_row(order_id: OrderId, row: &PgRow) -> Result<OrderItem, StoreError> {
    let decode = |e| map_sqlx_error("decode_order_item", e);

    let product_id: Uuid = row.try_get("product_id").map_err(decode)?;
    let quantity: i64 = row.try_get("quantity").map_err(decode)?;
    let price: Decimal = row.try_get("price").map_err(decode)?;

    let price = Money::new(price).map_err(|e| corrupt(order_id, e))?;
    OrderItem::create(ProductId::from_uuid(product_id), quantity, price)
        .map_err(|e| corrupt(order_id, e))
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let decode = |e| map_sqlx_error("decode_order", e);

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let customer_id: Uuid = row.try_get("customer_id").map_err(decode)?;
    let total: Decimal = row.try_get("total").map_err(decode)?;
    let original_total: Decimal = row.try_get("original_total").map_err(decode)?;
    let regional_adjustment: Decimal = row.try_get("regional_adjustment").map_err(decode)?;
    let tax_amount: Decimal = row.try_get("tax_amount").map_err(decode)?;
    let tax_rate: Decimal = row.try_get("tax_rate").map_err(decode)?;
    let discount_applied: String = row.try_get("discount_applied").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    if items.is_empty() {
        return Err(corrupt(id, "order has no line items"));
    }

    let pricing = PriceBreakdown {
        total: Money::new(total).map_err(|e| corrupt(id, e))?,
        original_total: Money::new(original_total).map_err(|e| corrupt(id, e))?,
        regional_adjustment,
        tax_amount: Money::new(tax_amount).map_err(|e| corrupt(id, e))?,
        tax_rate,
        discount_applied,
    };

    Ok(Order::load(
        OrderId::from_uuid(id),
        CustomerId::from_uuid(customer_id),
        items,
        pricing,
        created_at,
    ))
}
