use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Span, field, info, instrument, warn};

use storefront_core::{AggregateRoot, CustomerId, DomainError, OrderId, ProductId};
use storefront_events::EventBus;
use storefront_inventory::{Product, ProductEvent};
use storefront_orders::{
    CustomerLocation, Order, OrderEvent, OrderItem, PlaceOrder, PriceBreakdown, PricingEngine,
    PricingItem,
};

use crate::error::ServiceError;
use crate::publisher::{EventPublisher, JsonEnvelope};
use crate::repositories::{ConsumerDirectory, OrderRepository, ProductRepository};
use crate::unit_of_work::{TransactionContext, UnitOfWork, with_transaction};

/// One requested line of an order: which product and how many.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequestItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderRequestItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Everything a successful transaction hands back for post-commit work.
struct StagedOrder {
    order_id: OrderId,
    pricing: PriceBreakdown,
    product_events: Vec<ProductEvent>,
    order_events: Vec<OrderEvent>,
}

/// Places orders: validate → price → deduct stock → persist → publish.
///
/// ## Consistency
///
/// Pricing, every stock deduction and the order insert share one transaction.
/// Each deduction is a single conditional write, so two requests racing for
/// the last units cannot both succeed: the loser gets `InsufficientStock` (it
/// saw the committed decrement) or `Conflict` (it hit the uncommitted one).
/// Neither leaves a partial deduction behind.
///
/// ## Publication
///
/// `inventory.product.sold` events (one per line) and `orders.order.created`
/// are published after the commit. A failed placement publishes nothing.
#[derive(Debug)]
pub struct OrderPlacementService<S, B> {
    store: S,
    publisher: EventPublisher<B>,
    pricing: PricingEngine,
}

impl<S, B> OrderPlacementService<S, B>
where
    B: EventBus<JsonEnvelope>,
{
    /// Service with the default discount strategies (volume, Black Friday, holiday).
    pub fn new(store: S, bus: B) -> Self {
        Self::with_pricing(store, bus, PricingEngine::with_default_strategies())
    }

    pub fn with_pricing(store: S, bus: B, pricing: PricingEngine) -> Self {
        Self {
            store,
            publisher: EventPublisher::new(bus),
            pricing,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &EventPublisher<B> {
        &self.publisher
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }
}

impl<S, B> OrderPlacementService<S, B>
where
    S: UnitOfWork
        + ProductRepository<Session = <S as UnitOfWork>::Session>
        + OrderRepository<Session = <S as UnitOfWork>::Session>
        + ConsumerDirectory,
    B: EventBus<JsonEnvelope>,
{
    /// Place an order priced at the current instant.
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        items: &[OrderRequestItem],
    ) -> Result<OrderId, ServiceError> {
        self.place_order_at(customer_id, items, Utc::now()).await
    }

    /// Place an order priced at `at` (date-based discounts use its UTC date).
    #[instrument(
        skip(self, items),
        fields(customer_id = %customer_id, lines = items.len(), order_id = field::Empty)
    )]
    pub async fn place_order_at(
        &self,
        customer_id: CustomerId,
        items: &[OrderRequestItem],
        at: DateTime<Utc>,
    ) -> Result<OrderId, ServiceError> {
        let result = self.place(customer_id, items, at).await;

        match result {
            Ok(staged) => {
                Span::current().record("order_id", field::display(staged.order_id));

                let published = self.publisher.publish_all(staged.product_events)
                    + self.publisher.publish_all(staged.order_events);

                info!(
                    order_id = %staged.order_id,
                    customer_id = %customer_id,
                    total = %staged.pricing.total,
                    discount = %staged.pricing.discount_applied,
                    events = published,
                    "order placed"
                );
                Ok(staged.order_id)
            }
            Err(err) => {
                warn!(
                    customer_id = %customer_id,
                    error = %err,
                    retryable = err.kind().is_retryable(),
                    "order placement failed"
                );
                Err(err)
            }
        }
    }

    /// Committed state of an order.
    pub async fn find_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        let mut ctx = TransactionContext::none();
        OrderRepository::find_by_id(&self.store, &mut ctx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id} not found")))
    }

    async fn place(
        &self,
        customer_id: CustomerId,
        items: &[OrderRequestItem],
        at: DateTime<Utc>,
    ) -> Result<StagedOrder, ServiceError> {
        validate_request(items)?;

        let location = self
            .store
            .find_location(customer_id)
            .await?
            .ok_or(DomainError::ConsumerNotFound(customer_id))?;

        let this = self;
        with_transaction(&self.store, |mut ctx| async move {
            let outcome = this.stage(&mut ctx, customer_id, location, items, at).await;
            (ctx, outcome)
        })
        .await
    }

    /// Transaction body: load and price, deduct stock per line, insert the order.
    async fn stage(
        &self,
        ctx: &mut TransactionContext<<S as UnitOfWork>::Session>,
        customer_id: CustomerId,
        location: CustomerLocation,
        items: &[OrderRequestItem],
        at: DateTime<Utc>,
    ) -> Result<StagedOrder, ServiceError> {
        let mut products: Vec<Product> = Vec::with_capacity(items.len());
        for item in items {
            let product = ProductRepository::find_by_id(&self.store, ctx, item.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound(item.product_id))?;
            products.push(product);
        }

        let pricing_items: Vec<PricingItem> = products
            .iter()
            .zip(items)
            .map(|(product, item)| PricingItem::from_snapshot(&product.snapshot(), item.quantity))
            .collect();
        let pricing = self.pricing.quote(&pricing_items, location, at.date_naive())?;

        let mut order_items = Vec::with_capacity(items.len());
        let mut product_events = Vec::new();
        for (product, item) in products.iter().zip(items) {
            let remaining = self
                .store
                .update_stock(ctx, item.product_id, -item.quantity)
                .await?;

            // Replay the sale on the level this write started from.
            let mut sold = product.with_stock(remaining + item.quantity);
            sold.sell(item.quantity, at)?;

            order_items.push(OrderItem::create(
                item.product_id,
                item.quantity,
                product.price(),
            )?);
            product_events.extend(sold.take_pending_events());
        }

        let order_id = OrderId::new();
        let mut order = Order::create(PlaceOrder {
            order_id,
            customer_id,
            items: order_items,
            pricing: pricing.clone(),
            occurred_at: at,
        })?;
        OrderRepository::create(&self.store, ctx, &order).await?;

        Ok(StagedOrder {
            order_id,
            pricing,
            product_events,
            order_events: order.take_pending_events(),
        })
    }
}

fn validate_request(items: &[OrderRequestItem]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::validation("an order needs at least one item"));
    }
    if let Some(item) = items.iter().find(|i| i.quantity <= 0) {
        return Err(ServiceError::validation(format!(
            "quantity for product {} must be positive (got {})",
            item.product_id, item.quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use storefront_core::{ErrorKind, Money};
    use storefront_events::InMemoryEventBus;
    use storefront_inventory::{CreateProduct, ProductCategory};

    use crate::in_memory::InMemoryStore;

    type TestService = OrderPlacementService<InMemoryStore, Arc<InMemoryEventBus<JsonEnvelope>>>;

    fn test_service() -> TestService {
        OrderPlacementService::new(InMemoryStore::new(), Arc::new(InMemoryEventBus::new()))
    }

    fn test_customer(service: &TestService, location: CustomerLocation) -> CustomerId {
        let id = CustomerId::new();
        service.store().insert_consumer(id, location).unwrap();
        id
    }

    fn test_product(
        service: &TestService,
        cents: u64,
        stock: i64,
        category: ProductCategory,
    ) -> ProductId {
        let product = Product::create(CreateProduct {
            product_id: ProductId::new(),
            name: "Board game".to_string(),
            description: String::new(),
            price: Money::from_cents(cents),
            stock,
            category,
            occurred_at: Utc::now(),
        })
        .unwrap();
        service.store().seed_product(&product).unwrap();
        product.id_typed()
    }

    fn test_day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn places_order_and_deducts_stock() {
        let service = test_service();
        let customer = test_customer(&service, CustomerLocation::Europe);
        let product = test_product(&service, 10_000, 10, ProductCategory::General);

        let order_id = service
            .place_order_at(customer, &[OrderRequestItem::new(product, 1)], test_day(3, 3))
            .await
            .unwrap();

        let order = service.find_order(order_id).await.unwrap();
        assert_eq!(order.customer_id(), customer);
        assert_eq!(order.total().amount(), dec!(115.00));
        assert_eq!(order.tax_amount().amount(), dec!(15.00));
        assert_eq!(order.discount_applied(), "none");
        assert_eq!(order.items().len(), 1);
        assert_eq!(service.store().committed_stock(product).unwrap(), Some(9));
    }

    #[tokio::test]
    async fn black_friday_pricing_uses_the_order_date() {
        let service = test_service();
        let customer = test_customer(&service, CustomerLocation::Us);
        let product = test_product(&service, 10_000, 10, ProductCategory::General);

        let order_id = service
            .place_order_at(customer, &[OrderRequestItem::new(product, 1)], test_day(11, 29))
            .await
            .unwrap();

        let order = service.find_order(order_id).await.unwrap();
        assert_eq!(order.discount_applied(), "Black Friday");
        assert_eq!(order.total().amount(), dec!(75.00));
    }

    #[tokio::test]
    async fn date_discounts_follow_the_utc_calendar_day() {
        let service = test_service();
        let customer = test_customer(&service, CustomerLocation::Us);
        let product = test_product(&service, 10_000, 10, ProductCategory::General);
        let line = [OrderRequestItem::new(product, 1)];

        let late = Utc.with_ymd_and_hms(2026, 11, 29, 23, 59, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 11, 30, 0, 1, 0).unwrap();

        let on_the_day = service.place_order_at(customer, &line, late).await.unwrap();
        let after = service.place_order_at(customer, &line, next_day).await.unwrap();

        assert_eq!(
            service.find_order(on_the_day).await.unwrap().discount_applied(),
            "Black Friday"
        );
        assert_eq!(service.find_order(after).await.unwrap().discount_applied(), "none");
    }

    #[tokio::test]
    async fn publishes_sold_and_created_events_after_commit() {
        let service = test_service();
        let sub = service.publisher().subscribe();
        let customer = test_customer(&service, CustomerLocation::Us);
        let first = test_product(&service, 1_000, 5, ProductCategory::Toys);
        let second = test_product(&service, 2_000, 5, ProductCategory::Electronics);

        service
            .place_order(
                customer,
                &[OrderRequestItem::new(first, 2), OrderRequestItem::new(second, 1)],
            )
            .await
            .unwrap();

        let types: Vec<String> = std::iter::from_fn(|| sub.try_recv().ok())
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "inventory.product.sold",
                "inventory.product.sold",
                "orders.order.created"
            ]
        );
    }

    #[tokio::test]
    async fn repeated_product_lines_report_the_stored_stock() {
        let service = test_service();
        let sub = service.publisher().subscribe();
        let customer = test_customer(&service, CustomerLocation::Us);
        let product = test_product(&service, 1_000, 10, ProductCategory::General);

        service
            .place_order(
                customer,
                &[OrderRequestItem::new(product, 2), OrderRequestItem::new(product, 3)],
            )
            .await
            .unwrap();

        let remaining: Vec<i64> = std::iter::from_fn(|| sub.try_recv().ok())
            .filter(|e| e.event_type() == "inventory.product.sold")
            .filter_map(|e| e.payload()["remaining_stock"].as_i64())
            .collect();
        assert_eq!(remaining, vec![8, 5]);
        assert_eq!(service.store().committed_stock(product).unwrap(), Some(5));
    }

    #[tokio::test]
    async fn repeated_lines_cannot_oversell_together() {
        let service = test_service();
        let customer = test_customer(&service, CustomerLocation::Us);
        let product = test_product(&service, 1_000, 4, ProductCategory::General);

        let err = service
            .place_order(
                customer,
                &[OrderRequestItem::new(product, 3), OrderRequestItem::new(product, 3)],
            )
            .await
            .unwrap_err();

        match err {
            ServiceError::InsufficientStock {
                available: 1,
                requested: 3,
                ..
            } => {}
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(service.store().committed_stock(product).unwrap(), Some(4));
    }

    #[tokio::test]
    async fn unknown_consumer_fails_before_any_transaction() {
        let service = test_service();
        let product = test_product(&service, 1_000, 5, ProductCategory::General);

        let err = service
            .place_order(CustomerId::new(), &[OrderRequestItem::new(product, 1)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(service.store().open_session_count().unwrap(), 0);
        assert_eq!(service.store().committed_stock(product).unwrap(), Some(5));
    }

    #[tokio::test]
    async fn malformed_requests_are_validation_errors() {
        let service = test_service();
        let customer = test_customer(&service, CustomerLocation::Us);
        let product = test_product(&service, 1_000, 5, ProductCategory::General);

        for items in [vec![], vec![OrderRequestItem::new(product, 0)]] {
            let err = service.place_order(customer, &items).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(service.store().committed_order_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn insufficient_stock_on_a_later_line_rolls_back_earlier_lines() {
        let service = test_service();
        let sub = service.publisher().subscribe();
        let customer = test_customer(&service, CustomerLocation::Asia);
        let plenty = test_product(&service, 1_000, 50, ProductCategory::General);
        let scarce = test_product(&service, 1_000, 1, ProductCategory::General);

        let err = service
            .place_order(
                customer,
                &[OrderRequestItem::new(plenty, 10), OrderRequestItem::new(scarce, 2)],
            )
            .await
            .unwrap_err();

        match err {
            ServiceError::InsufficientStock {
                product_id,
                available: 1,
                requested: 2,
            } if product_id == scarce => {}
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(service.store().committed_stock(plenty).unwrap(), Some(50));
        assert_eq!(service.store().committed_stock(scarce).unwrap(), Some(1));
        assert_eq!(service.store().committed_order_count().unwrap(), 0);
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let service = test_service();
        let customer = test_customer(&service, CustomerLocation::Us);

        let err = service
            .place_order(customer, &[OrderRequestItem::new(ProductId::new(), 1)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(service.store().open_session_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let service = test_service();
        let err = service.find_order(OrderId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
