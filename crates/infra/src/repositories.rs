//! Repository boundaries used by the application services.
//!
//! Writes require an active [`TransactionContext`]; reads use the session when
//! one is available and committed state otherwise.

use async_trait::async_trait;

use storefront_core::{CustomerId, OrderId, ProductId};
use storefront_inventory::Product;
use storefront_orders::{CustomerLocation, Order};

use crate::error::StoreError;
use crate::unit_of_work::TransactionContext;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    type Session: Send;

    async fn find_by_id(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        id: ProductId,
    ) -> Result<Option<Product>, StoreError>;

    async fn create(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        product: &Product,
    ) -> Result<(), StoreError>;

    /// Apply a stock change atomically and return the resulting stock.
    ///
    /// - `change > 0`: unconditional increment (`ProductNotFound` if absent).
    /// - `change < 0`: decrement only if enough stock is on hand, in one
    ///   conditional write. A miss is `StockConditionFailed` when the product
    ///   exists and `ProductNotFound` when it does not.
    /// - `change == 0`: `InvalidStockChange`.
    ///
    /// A competing uncommitted write on the same product is `WriteConflict`.
    async fn update_stock(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        id: ProductId,
        change: i64,
    ) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    type Session: Send;

    async fn create(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        order: &Order,
    ) -> Result<(), StoreError>;

    async fn find_by_id(
        &self,
        ctx: &mut TransactionContext<Self::Session>,
        id: OrderId,
    ) -> Result<Option<Order>, StoreError>;
}

/// Read-only view of consumer reference data owned elsewhere.
#[async_trait]
pub trait ConsumerDirectory: Send + Sync {
    async fn find_location(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerLocation>, StoreError>;
}
