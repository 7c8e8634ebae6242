//! Integration tests for the full placement pipeline.
//!
//! Tests: Service → UnitOfWork → Repositories → commit → EventBus → worker
//!
//! Verifies:
//! - Concurrent orders for the last units never oversell
//! - A failed placement leaves stock untouched and publishes nothing
//! - Subscribers only see events of committed transactions

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use rust_decimal_macros::dec;

    use storefront_core::{CustomerId, ErrorKind, Money, ProductId};
    use storefront_events::{EventBus, InMemoryEventBus};
    use storefront_inventory::ProductCategory;
    use storefront_orders::CustomerLocation;

    use crate::error::ServiceError;
    use crate::in_memory::InMemoryStore;
    use crate::publisher::JsonEnvelope;
    use crate::services::{InventoryService, NewProduct, OrderPlacementService, OrderRequestItem};
    use crate::workers::EventLogWorker;

    type TestBus = Arc<InMemoryEventBus<JsonEnvelope>>;

    struct Harness {
        store: InMemoryStore,
        bus: TestBus,
        inventory: Arc<InventoryService<InMemoryStore, TestBus>>,
        orders: Arc<OrderPlacementService<InMemoryStore, TestBus>>,
    }

    fn setup() -> Harness {
        let store = InMemoryStore::new();
        let bus: TestBus = Arc::new(InMemoryEventBus::new());
        Harness {
            inventory: Arc::new(InventoryService::new(store.clone(), bus.clone())),
            orders: Arc::new(OrderPlacementService::new(store.clone(), bus.clone())),
            store,
            bus,
        }
    }

    fn test_customer(h: &Harness, location: CustomerLocation) -> CustomerId {
        let id = CustomerId::new();
        h.store.insert_consumer(id, location).unwrap();
        id
    }

    async fn test_product(h: &Harness, stock: i64) -> ProductId {
        h.inventory
            .create_product(NewProduct {
                name: "Headphones".to_string(),
                description: "Over-ear".to_string(),
                price: Money::from_cents(5_000),
                stock,
                category: ProductCategory::Electronics,
            })
            .await
            .unwrap()
    }

    fn is_lost_race(err: &ServiceError) -> bool {
        matches!(err.kind(), ErrorKind::Conflict | ErrorKind::InsufficientStock)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_for_the_last_units_never_oversell() {
        let h = setup();
        let customer = test_customer(&h, CustomerLocation::Us);
        let product = test_product(&h, 10).await;

        let mut tasks = Vec::new();
        for _ in 0..2 {
            let orders = Arc::clone(&h.orders);
            tasks.push(tokio::spawn(async move {
                orders
                    .place_order(customer, &[OrderRequestItem::new(product, 6)])
                    .await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) if is_lost_race(&err) => {}
                Err(other) => panic!("unexpected placement error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(h.store.committed_stock(product).unwrap(), Some(4));
        assert_eq!(h.store.committed_order_count().unwrap(), 1);
        assert_eq!(h.store.open_session_count().unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn order_and_direct_sale_race_for_the_same_stock() {
        let h = setup();
        let customer = test_customer(&h, CustomerLocation::Europe);
        let product = test_product(&h, 10).await;

        let orders = Arc::clone(&h.orders);
        let order_task = tokio::spawn(async move {
            orders
                .place_order(customer, &[OrderRequestItem::new(product, 6)])
                .await
                .map(|_| ())
        });
        let inventory = Arc::clone(&h.inventory);
        let sale_task = tokio::spawn(async move {
            inventory.sell_product(product, 6).await.map(|_| ())
        });

        let outcomes = [order_task.await.unwrap(), sale_task.await.unwrap()];
        let successes = outcomes.iter().filter(|o| o.is_ok()).count();

        assert_eq!(successes, 1);
        for outcome in &outcomes {
            if let Err(err) = outcome {
                assert!(is_lost_race(err), "unexpected error: {err:?}");
            }
        }
        assert_eq!(h.store.committed_stock(product).unwrap(), Some(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_small_orders_deduct_exactly_what_succeeded() {
        let h = setup();
        let customer = test_customer(&h, CustomerLocation::Asia);
        let product = test_product(&h, 5).await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let orders = Arc::clone(&h.orders);
            tasks.push(tokio::spawn(async move {
                orders
                    .place_order(customer, &[OrderRequestItem::new(product, 1)])
                    .await
            }));
        }

        let mut successes = 0i64;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) if is_lost_race(&err) => {}
                Err(other) => panic!("unexpected placement error: {other:?}"),
            }
        }

        assert!(successes >= 1 && successes <= 5);
        assert_eq!(h.store.committed_stock(product).unwrap(), Some(5 - successes));
        assert_eq!(h.store.committed_order_count().unwrap() as i64, successes);
    }

    #[tokio::test]
    async fn failed_placement_publishes_nothing_and_keeps_stock() {
        let h = setup();
        let customer = test_customer(&h, CustomerLocation::Us);
        let in_stock = test_product(&h, 8).await;
        let low = test_product(&h, 2).await;
        let sub = h.bus.subscribe();

        let err = h
            .orders
            .place_order(
                customer,
                &[OrderRequestItem::new(in_stock, 3), OrderRequestItem::new(low, 3)],
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(h.store.committed_stock(in_stock).unwrap(), Some(8));
        assert_eq!(h.store.committed_stock(low).unwrap(), Some(2));
        assert_eq!(h.store.committed_order_count().unwrap(), 0);
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_kinds_for_bad_requests() {
        let h = setup();
        let customer = test_customer(&h, CustomerLocation::Us);
        let product = test_product(&h, 3).await;

        let unknown_customer = h
            .orders
            .place_order(CustomerId::new(), &[OrderRequestItem::new(product, 1)])
            .await
            .unwrap_err();
        let unknown_product = h
            .orders
            .place_order(customer, &[OrderRequestItem::new(ProductId::new(), 1)])
            .await
            .unwrap_err();
        let empty = h.orders.place_order(customer, &[]).await.unwrap_err();

        assert_eq!(unknown_customer.kind(), ErrorKind::NotFound);
        assert_eq!(unknown_product.kind(), ErrorKind::NotFound);
        assert_eq!(empty.kind(), ErrorKind::Validation);
        assert_eq!(empty.kind().http_status(), 400);
        assert_eq!(h.store.committed_stock(product).unwrap(), Some(3));
    }

    #[tokio::test]
    async fn volume_discount_applies_to_committed_order() {
        let h = setup();
        let customer = test_customer(&h, CustomerLocation::Us);
        let product = test_product(&h, 100).await;

        let order_id = h
            .orders
            .place_order(customer, &[OrderRequestItem::new(product, 5)])
            .await
            .unwrap();

        let order = h.orders.find_order(order_id).await.unwrap();
        assert_eq!(order.original_total().amount(), dec!(250.00));
        assert!(order.total() <= order.original_total());
        assert_eq!(h.store.committed_stock(product).unwrap(), Some(95));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn event_log_worker_sees_committed_events() {
        let h = setup();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen_in_worker = Arc::clone(&seen);
        let worker = EventLogWorker::spawn_with("event-log-it", &h.bus, move |envelope| {
            seen_in_worker
                .lock()
                .unwrap()
                .push(envelope.event_type().to_string());
        })
        .unwrap();

        let customer = test_customer(&h, CustomerLocation::Us);
        let product = test_product(&h, 4).await;
        h.orders
            .place_order(customer, &[OrderRequestItem::new(product, 2)])
            .await
            .unwrap();
        let _ = h
            .orders
            .place_order(customer, &[OrderRequestItem::new(product, 9)])
            .await
            .unwrap_err();

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().unwrap().len() < 3 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(worker.shutdown(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "inventory.product.created",
                "inventory.product.sold",
                "orders.order.created"
            ]
        );
    }
}
