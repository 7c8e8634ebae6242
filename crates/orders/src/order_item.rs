use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Money, ProductId, ValueObject};

/// Immutable order line: product, strictly positive quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    product_id: ProductId,
    quantity: i64,
    price: Money,
}

impl OrderItem {
    pub fn create(product_id: ProductId, quantity: i64, price: Money) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::invalid_quantity(format!(
                "quantity must be positive (got {quantity})"
            )));
        }
        Ok(Self {
            product_id,
            quantity,
            price,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn price(&self) -> Money {
        self.price
    }

    /// `price × quantity`.
    pub fn total(&self) -> DomainResult<Money> {
        self.price.times(self.quantity)
    }
}

impl ValueObject for OrderItem {}
