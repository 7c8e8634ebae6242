use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_core::{AggregateRoot, DomainError, DomainResult, Money, PendingEvents, ProductId};
use storefront_events::{DomainEvent, Event};

use crate::category::ProductCategory;

/// Highest accepted unit price, in cents (1,000,000.00).
pub const MAX_PRICE_CENTS: u64 = 100_000_000;

/// Stock ceiling per product; also the largest single restock.
pub const MAX_STOCK: i64 = 1_000_000;

/// Aggregate root: Product.
///
/// Stock only moves through [`Product::restock`] and [`Product::sell`], both of
/// which keep it inside `[0, MAX_STOCK]`. Every accepted change queues an event
/// that stays pending until the caller drains it after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    stock: i64,
    category: ProductCategory,
    pending: PendingEvents<ProductEvent>,
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
    pub category: ProductCategory,
    pub occurred_at: DateTime<Utc>,
}

/// The slice of a product that pricing and stock checks need.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub price: Money,
    pub stock: i64,
    pub category: ProductCategory,
}

impl Product {
    /// Validate and build a new product, queuing `ProductCreated`.
    pub fn create(cmd: CreateProduct) -> DomainResult<Self> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        ensure_price(cmd.price)?;
        if cmd.stock < 0 {
            return Err(DomainError::invalid_stock(format!(
                "initial stock cannot be negative (got {})",
                cmd.stock
            )));
        }
        if cmd.stock > MAX_STOCK {
            return Err(DomainError::invalid_stock(format!(
                "initial stock {} exceeds the maximum of {MAX_STOCK}",
                cmd.stock
            )));
        }

        let mut product = Self {
            id: cmd.product_id,
            name: cmd.name,
            description: cmd.description,
            price: cmd.price,
            stock: cmd.stock,
            category: cmd.category,
            pending: PendingEvents::new(),
        };

        product.pending.record(ProductEvent::Created(ProductCreated {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
            category: product.category,
            occurred_at: cmd.occurred_at,
        }));

        Ok(product)
    }

    /// Rehydrate from storage. Queues nothing.
    pub fn load(
        id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: i64,
        category: ProductCategory,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            price,
            stock,
            category,
            pending: PendingEvents::new(),
        }
    }

    /// Copy at another stock level with no pending events, e.g. the level a
    /// store write actually produced.
    pub fn with_stock(&self, stock: i64) -> Self {
        Self::load(
            self.id,
            self.name.clone(),
            self.description.clone(),
            self.price,
            stock,
            self.category,
        )
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn category(&self) -> ProductCategory {
        self.category
    }

    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            price: self.price,
            stock: self.stock,
            category: self.category,
        }
    }

    /// Add `amount` units; the result must stay within `MAX_STOCK`.
    pub fn restock(&mut self, amount: i64, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::invalid_stock(format!(
                "restock amount must be positive (got {amount})"
            )));
        }
        let new_stock = self
            .stock
            .checked_add(amount)
            .filter(|s| *s <= MAX_STOCK)
            .ok_or_else(|| {
                DomainError::invalid_stock(format!(
                    "restocking {amount} would exceed the maximum of {MAX_STOCK} (current {})",
                    self.stock
                ))
            })?;

        self.stock = new_stock;
        self.pending.record(ProductEvent::Restocked(ProductRestocked {
            product_id: self.id,
            quantity: amount,
            new_stock,
            occurred_at,
        }));
        Ok(())
    }

    /// Remove `amount` units. Never clamps: asking for more than is on hand fails.
    pub fn sell(&mut self, amount: i64, occurred_at: DateTime<Utc>) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::invalid_stock(format!(
                "sell amount must be positive (got {amount})"
            )));
        }
        if amount > self.stock {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                available: self.stock,
                requested: amount,
            });
        }

        self.stock -= amount;
        self.pending.record(ProductEvent::Sold(ProductSold {
            product_id: self.id,
            quantity: amount,
            remaining_stock: self.stock,
            occurred_at,
        }));
        Ok(())
    }
}

fn ensure_price(price: Money) -> DomainResult<()> {
    let min = Money::from_cents(1);
    let max = Money::from_cents(MAX_PRICE_CENTS);
    if price < min || price > max {
        return Err(DomainError::invalid_price(format!(
            "price must be between {min} and {max} (got {price})"
        )));
    }
    Ok(())
}

impl AggregateRoot for Product {
    type Id = ProductId;
    type Event = ProductEvent;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn pending_events(&self) -> &[Self::Event] {
        self.pending.as_slice()
    }

    fn take_pending_events(&mut self) -> Vec<Self::Event> {
        self.pending.drain()
    }
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub category: ProductCategory,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRestocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRestocked {
    pub product_id: ProductId,
    pub quantity: i64,
    pub new_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductSold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSold {
    pub product_id: ProductId,
    pub quantity: i64,
    pub remaining_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created(ProductCreated),
    Restocked(ProductRestocked),
    Sold(ProductSold),
}

impl ProductEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::Created(e) => e.product_id,
            ProductEvent::Restocked(e) => e.product_id,
            ProductEvent::Sold(e) => e.product_id,
        }
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::Created(_) => "inventory.product.created",
            ProductEvent::Restocked(_) => "inventory.product.restocked",
            ProductEvent::Sold(_) => "inventory.product.sold",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::Created(e) => e.occurred_at,
            ProductEvent::Restocked(e) => e.occurred_at,
            ProductEvent::Sold(e) => e.occurred_at,
        }
    }
}

impl DomainEvent for ProductEvent {
    fn aggregate_type(&self) -> &'static str {
        "inventory.product"
    }

    fn aggregate_id(&self) -> Uuid {
        *self.product_id().as_uuid()
    }
}
