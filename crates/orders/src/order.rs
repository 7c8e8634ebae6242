use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_core::{
    AggregateRoot, CustomerId, DomainError, DomainResult, Money, OrderId, PendingEvents, ProductId,
};
use storefront_events::{DomainEvent, Event};

use crate::order_item::OrderItem;
use crate::pricing::PriceBreakdown;

/// Aggregate root: Order.
///
/// Immutable once built. Totals are computed by the pricing engine before the
/// order exists; the aggregate only checks that they are coherent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    pricing: PriceBreakdown,
    created_at: DateTime<Utc>,
    pending: PendingEvents<OrderEvent>,
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub pricing: PriceBreakdown,
    pub occurred_at: DateTime<Utc>,
}

impl Order {
    /// Build a new order and queue `OrderCreated`.
    pub fn create(cmd: PlaceOrder) -> DomainResult<Self> {
        if cmd.items.is_empty() {
            return Err(DomainError::invariant("order must contain at least one item"));
        }
        ensure_tax_rate(cmd.pricing.tax_rate)?;

        let mut order = Self {
            id: cmd.order_id,
            customer_id: cmd.customer_id,
            items: cmd.items,
            pricing: cmd.pricing,
            created_at: cmd.occurred_at,
            pending: PendingEvents::new(),
        };

        order.pending.record(OrderEvent::Created(OrderCreated {
            order_id: order.id,
            customer_id: order.customer_id,
            lines: order.items.iter().map(OrderLine::from).collect(),
            total: order.pricing.total,
            original_total: order.pricing.original_total,
            regional_adjustment: order.pricing.regional_adjustment,
            tax_amount: order.pricing.tax_amount,
            tax_rate: order.pricing.tax_rate,
            discount_applied: order.pricing.discount_applied.clone(),
            occurred_at: cmd.occurred_at,
        }));

        Ok(order)
    }

    /// Rehydrate from storage. Queues nothing.
    pub fn load(
        id: OrderId,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        pricing: PriceBreakdown,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_id,
            items,
            pricing,
            created_at,
            pending: PendingEvents::new(),
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn pricing(&self) -> &PriceBreakdown {
        &self.pricing
    }

    pub fn total(&self) -> Money {
        self.pricing.total
    }

    pub fn original_total(&self) -> Money {
        self.pricing.original_total
    }

    pub fn regional_adjustment(&self) -> Decimal {
        self.pricing.regional_adjustment
    }

    pub fn tax_amount(&self) -> Money {
        self.pricing.tax_amount
    }

    pub fn tax_rate(&self) -> Decimal {
        self.pricing.tax_rate
    }

    pub fn discount_applied(&self) -> &str {
        &self.pricing.discount_applied
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn ensure_tax_rate(rate: Decimal) -> DomainResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(DomainError::invariant(format!(
            "tax rate must be between 0 and 1 (got {rate})"
        )));
    }
    Ok(())
}

impl AggregateRoot for Order {
    type Id = OrderId;
    type Event = OrderEvent;

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

/// Flattened copy of an order line carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Money,
}

impl From<&OrderItem> for OrderLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id(),
            quantity: item.quantity(),
            price: item.price(),
        }
    }
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub original_total: Money,
    pub regional_adjustment: Decimal,
    pub tax_amount: Money,
    pub tax_rate: Decimal,
    pub discount_applied: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created(OrderCreated),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "orders.order.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Created(e) => e.occurred_at,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn aggregate_type(&self) -> &'static str {
        "orders.order"
    }

    fn aggregate_id(&self) -> Uuid {
        match self {
            OrderEvent::Created(e) => *e.order_id.as_uuid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_pricing() -> PriceBreakdown {
        PriceBreakdown {
            total: Money::new(dec!(115)).unwrap(),
            original_total: Money::new(dec!(100)).unwrap(),
            regional_adjustment: dec!(0),
            tax_amount: Money::new(dec!(15)).unwrap(),
            tax_rate: dec!(0.15),
            discount_applied: "none".to_string(),
        }
    }

    fn test_place(items: Vec<OrderItem>) -> PlaceOrder {
        PlaceOrder {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            items,
            pricing: test_pricing(),
            occurred_at: Utc::now(),
        }
    }

    fn test_items() -> Vec<OrderItem> {
        vec![OrderItem::create(ProductId::new(), 1, Money::from_cents(10_000)).unwrap()]
    }

    #[test]
    fn create_rejects_empty_items_without_queuing_events() {
        match Order::create(test_place(Vec::new())) {
            Err(err @ DomainError::InvariantViolation(_)) => {
                assert_eq!(err.kind(), storefront_core::ErrorKind::InvalidDomainState);
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_out_of_range_tax_rate() {
        let mut cmd = test_place(test_items());
        cmd.pricing.tax_rate = dec!(1.5);
        assert!(matches!(Order::create(cmd), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn created_event_carries_line_snapshot() {
        let items = test_items();
        let product_id = items[0].product_id();
        let mut order = Order::create(test_place(items)).unwrap();

        let events = order.take_pending_events();
        assert_eq!(events.len(), 1);
        let OrderEvent::Created(created) = &events[0];
        assert_eq!(created.order_id, order.id_typed());
        assert_eq!(created.lines.len(), 1);
        assert_eq!(created.lines[0].product_id, product_id);
        assert_eq!(created.lines[0].quantity, 1);
        assert_eq!(created.total.amount(), dec!(115));
        assert_eq!(events[0].event_type(), "orders.order.created");
        assert!(order.pending_events().is_empty());
    }

    #[test]
    fn load_does_not_queue_events() {
        let order = Order::load(
            OrderId::new(),
            CustomerId::new(),
            test_items(),
            test_pricing(),
            Utc::now(),
        );
        assert!(order.pending_events().is_empty());
        assert_eq!(order.tax_rate(), dec!(0.15));
        assert_eq!(order.discount_applied(), "none");
    }
}
