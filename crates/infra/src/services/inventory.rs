use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use storefront_core::{AggregateRoot, DomainError, DomainResult, Money, ProductId};
use storefront_events::EventBus;
use storefront_inventory::{CreateProduct, Product, ProductCategory, ProductEvent};

use crate::error::ServiceError;
use crate::publisher::{EventPublisher, JsonEnvelope};
use crate::repositories::ProductRepository;
use crate::unit_of_work::{TransactionContext, UnitOfWork, with_transaction};

/// Input of [`InventoryService::create_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
    pub category: ProductCategory,
}

/// Create, restock and sell catalog products.
#[derive(Debug)]
pub struct InventoryService<S, B> {
    store: S,
    publisher: EventPublisher<B>,
}

impl<S, B> InventoryService<S, B>
where
    B: EventBus<JsonEnvelope>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            publisher: EventPublisher::new(bus),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &EventPublisher<B> {
        &self.publisher
    }
}

impl<S, B> InventoryService<S, B>
where
    S: UnitOfWork + ProductRepository<Session = <S as UnitOfWork>::Session>,
    B: EventBus<JsonEnvelope>,
{
    #[instrument(skip(self, input), fields(name = %input.name, stock = input.stock))]
    pub async fn create_product(&self, input: NewProduct) -> Result<ProductId, ServiceError> {
        let mut product = Product::create(CreateProduct {
            product_id: ProductId::new(),
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            category: input.category,
            occurred_at: Utc::now(),
        })?;
        let product_id = product.id_typed();
        let events = product.take_pending_events();

        let store = &self.store;
        let product_ref = &product;
        let result: Result<(), ServiceError> = with_transaction(store, |mut ctx| async move {
            let outcome = ProductRepository::create(store, &mut ctx, product_ref)
                .await
                .map_err(ServiceError::from);
            (ctx, outcome)
        })
        .await;

        if let Err(err) = result {
            warn!(product_id = %product_id, error = %err, "product creation failed");
            return Err(err);
        }

        self.publisher.publish_all(events);
        info!(product_id = %product_id, "product created");
        Ok(product_id)
    }

    /// Add `amount` units and return the new stock level.
    pub async fn restock_product(&self, id: ProductId, amount: i64) -> Result<i64, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::validation(format!(
                "restock amount must be positive (got {amount})"
            )));
        }
        self.change_stock(id, amount, Utc::now()).await
    }

    /// Remove `amount` units and return the remaining stock level.
    pub async fn sell_product(&self, id: ProductId, amount: i64) -> Result<i64, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::validation(format!(
                "sell amount must be positive (got {amount})"
            )));
        }
        self.change_stock(id, -amount, Utc::now()).await
    }

    /// Committed state of a product.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        let mut ctx = TransactionContext::none();
        ProductRepository::find_by_id(&self.store, &mut ctx, id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(id).into())
    }

    #[instrument(skip(self, at), fields(product_id = %id))]
    async fn change_stock(
        &self,
        id: ProductId,
        change: i64,
        at: DateTime<Utc>,
    ) -> Result<i64, ServiceError> {
        let store = &self.store;
        let result: Result<(i64, Vec<ProductEvent>), ServiceError> =
            with_transaction(store, |mut ctx| async move {
                let outcome = apply_stock_change(store, &mut ctx, id, change, at).await;
                (ctx, outcome)
            })
            .await;

        match result {
            Ok((new_stock, events)) => {
                self.publisher.publish_all(events);
                info!(product_id = %id, change, new_stock, "stock updated");
                Ok(new_stock)
            }
            Err(err) => {
                warn!(product_id = %id, change, error = %err, "stock update failed");
                Err(err)
            }
        }
    }
}

/// Run the domain rule on the loaded aggregate, then the conditional store write.
async fn apply_stock_change<S>(
    store: &S,
    ctx: &mut TransactionContext<<S as UnitOfWork>::Session>,
    id: ProductId,
    change: i64,
    at: DateTime<Utc>,
) -> Result<(i64, Vec<ProductEvent>), ServiceError>
where
    S: UnitOfWork + ProductRepository<Session = <S as UnitOfWork>::Session>,
{
    let loaded = ProductRepository::find_by_id(store, ctx, id)
        .await?
        .ok_or(DomainError::ProductNotFound(id))?;
    apply_domain_rule(&mut loaded.clone(), change, at)?;

    let new_stock = store.update_stock(ctx, id, change).await?;

    // Events carry the level the store wrote, not the one read above.
    let mut stored = loaded.with_stock(new_stock - change);
    apply_domain_rule(&mut stored, change, at)?;
    Ok((new_stock, stored.take_pending_events()))
}

fn apply_domain_rule(product: &mut Product, change: i64, at: DateTime<Utc>) -> DomainResult<()> {
    if change > 0 {
        product.restock(change, at)
    } else {
        product.sell(change.saturating_neg(), at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use storefront_core::ErrorKind;
    use storefront_events::InMemoryEventBus;

    use crate::in_memory::InMemoryStore;

    type TestService = InventoryService<InMemoryStore, Arc<InMemoryEventBus<JsonEnvelope>>>;

    fn test_service() -> TestService {
        InventoryService::new(InMemoryStore::new(), Arc::new(InMemoryEventBus::new()))
    }

    fn test_product(stock: i64) -> NewProduct {
        NewProduct {
            name: "Robot kit".to_string(),
            description: "Build-your-own robot".to_string(),
            price: Money::from_cents(4_999),
            stock,
            category: ProductCategory::Toys,
        }
    }

    #[tokio::test]
    async fn create_product_persists_and_publishes() {
        let service = test_service();
        let sub = service.publisher().subscribe();

        let id = service.create_product(test_product(10)).await.unwrap();

        let product = service.get_product(id).await.unwrap();
        assert_eq!(product.stock(), 10);
        assert_eq!(product.price(), Money::from_cents(4_999));
        assert_eq!(sub.try_recv().unwrap().event_type(), "inventory.product.created");
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_product_is_rejected_before_storage() {
        let service = test_service();
        let sub = service.publisher().subscribe();

        let err = service.create_product(test_product(-1)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidDomainState);
        assert_eq!(service.store().open_session_count().unwrap(), 0);
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn restock_and_sell_move_stock() {
        let service = test_service();
        let id = service.create_product(test_product(10)).await.unwrap();
        let sub = service.publisher().subscribe();

        assert_eq!(service.restock_product(id, 5).await.unwrap(), 15);
        assert_eq!(service.sell_product(id, 12).await.unwrap(), 3);

        assert_eq!(service.store().committed_stock(id).unwrap(), Some(3));
        assert_eq!(sub.try_recv().unwrap().event_type(), "inventory.product.restocked");
        assert_eq!(sub.try_recv().unwrap().event_type(), "inventory.product.sold");
    }

    #[tokio::test]
    async fn stock_events_carry_the_stored_level() {
        let service = test_service();
        let id = service.create_product(test_product(10)).await.unwrap();
        let sub = service.publisher().subscribe();

        service.restock_product(id, 5).await.unwrap();
        service.sell_product(id, 7).await.unwrap();

        let restocked = sub.try_recv().unwrap();
        assert_eq!(restocked.payload()["new_stock"], 15);
        let sold = sub.try_recv().unwrap();
        assert_eq!(sold.payload()["remaining_stock"], 8);
        assert_eq!(service.store().committed_stock(id).unwrap(), Some(8));
    }

    #[tokio::test]
    async fn overselling_fails_and_leaves_stock() {
        let service = test_service();
        let id = service.create_product(test_product(4)).await.unwrap();
        let sub = service.publisher().subscribe();

        let err = service.sell_product(id, 6).await.unwrap_err();

        match err {
            ServiceError::InsufficientStock {
                product_id,
                available: 4,
                requested: 6,
            } if product_id == id => {}
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(service.store().committed_stock(id).unwrap(), Some(4));
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn restock_past_the_bound_is_rejected() {
        let service = test_service();
        let id = service.create_product(test_product(999_999)).await.unwrap();

        assert_eq!(service.restock_product(id, 1).await.unwrap(), 1_000_000);
        let err = service.restock_product(id, 1).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidDomainState);
        assert_eq!(service.store().committed_stock(id).unwrap(), Some(1_000_000));
    }

    #[tokio::test]
    async fn zero_or_negative_amounts_are_validation_errors() {
        let service = test_service();
        let id = service.create_product(test_product(4)).await.unwrap();

        for err in [
            service.restock_product(id, 0).await.unwrap_err(),
            service.sell_product(id, -2).await.unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let service = test_service();

        let err = service.sell_product(ProductId::new(), 1).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(service.store().open_session_count().unwrap(), 0);
    }
}
