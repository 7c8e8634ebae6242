//! In-memory transactional store (tests/dev).
//!
//! One [`InMemoryStore`] backs every repository and the unit of work. Writes
//! are staged per session and become visible to other sessions only on
//! commit. A product can carry at most one uncommitted stock write; a second
//! session touching it gets `WriteConflict`, mirroring the write-conflict
//! abort of document stores with snapshot transactions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use storefront_core::{CustomerId, OrderId, ProductId};
use storefront_inventory::{MAX_STOCK, Product};
use storefront_orders::{CustomerLocation, Order};

use crate::error::StoreError;
use crate::repositories::{ConsumerDirectory, OrderRepository, ProductRepository};
use crate::unit_of_work::{TransactionContext, UnitOfWork};

/// Handle of an open in-memory transaction.
///
/// Dropping a session that was neither committed nor rolled back discards its
/// staged writes, like a dropped `sqlx::Transaction`.
#[derive(Debug)]
pub struct InMemorySession {
    id: u64,
    state: Arc<Mutex<State>>,
    finished: bool,
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        discard_session(&mut state, self.id);
    }
}

#[derive(Debug, Clone)]
struct ProductRecord {
    product: Product,
    /// `(session, stock)` of the single uncommitted stock write, if any.
    pending_stock: Option<(u64, i64)>,
}

#[derive(Debug, Default)]
struct StagedWrites {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, ProductRecord>,
    orders: HashMap<OrderId, Order>,
    consumers: HashMap<CustomerId, CustomerLocation>,
    sessions: HashMap<u64, StagedWrites>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    next_session: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    /// Register consumer reference data (seeding for tests/dev).
    pub fn insert_consumer(
        &self,
        customer_id: CustomerId,
        location: CustomerLocation,
    ) -> Result<(), StoreError> {
        self.lock()?.consumers.insert(customer_id, location);
        Ok(())
    }

    /// Insert a product directly as committed state, bypassing transactions.
    pub fn seed_product(&self, product: &Product) -> Result<(), StoreError> {
        self.lock()?.products.insert(
            product.id_typed(),
            ProductRecord {
                product: product.with_stock(product.stock()),
                pending_stock: None,
            },
        );
        Ok(())
    }

    /// Committed stock of a product, ignoring uncommitted writes.
    pub fn committed_stock(&self, id: ProductId) -> Result<Option<i64>, StoreError> {
        Ok(self.lock()?.products.get(&id).map(|r| r.product.stock()))
    }

    pub fn committed_order_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.orders.len())
    }

    pub fn open_session_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.sessions.len())
    }
}

/// Forget a session's staged writes and release its stock writes.
fn discard_session(state: &mut State, session_id: u64) {
    state.sessions.remove(&session_id);
    for record in state.products.values_mut() {
        if matches!(record.pending_stock, Some((owner, _)) if owner == session_id) {
            record.pending_stock = None;
        }
    }
}

fn ensure_open(state: &State, session: &InMemorySession) -> Result<(), StoreError> {
    if state.sessions.contains_key(&session.id) {
        Ok(())
    } else {
        Err(StoreError::NoActiveTransaction)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession, StoreError> {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock()?.sessions.insert(id, StagedWrites::default());
        Ok(InMemorySession {
            id,
            state: Arc::clone(&self.state),
            finished: false,
        })
    }

    async fn commit(&self, mut session: InMemorySession) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        session.finished = true;
        let staged = state
            .sessions
            .remove(&session.id)
            .ok_or(StoreError::NoActiveTransaction)?;

        for record in state.products.values_mut() {
            if let Some((owner, stock)) = record.pending_stock {
                if owner == session.id {
                    record.product = record.product.with_stock(stock);
                    record.pending_stock = None;
                }
            }
        }
        for (id, product) in staged.products {
            state.products.insert(
                id,
                ProductRecord {
                    product,
                    pending_stock: None,
                },
            );
        }
        state.orders.extend(staged.orders);
        Ok(())
    }

    async fn rollback(&self, mut session: InMemorySession) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        session.finished = true;
        discard_session(&mut state, session.id);
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    type Session = InMemorySession;

    async fn find_by_id(
        &self,
        ctx: &mut TransactionContext<InMemorySession>,
        id: ProductId,
    ) -> Result<Option<Product>, StoreError> {
        let state = self.lock()?;

        let Some(session) = ctx.session_if_available() else {
            return Ok(state.products.get(&id).map(|r| r.product.clone()));
        };
        ensure_open(&state, session)?;

        if let Some(staged) = state
            .sessions
            .get(&session.id)
            .and_then(|s| s.products.get(&id))
        {
            return Ok(Some(staged.clone()));
        }

        Ok(state.products.get(&id).map(|record| match record.pending_stock {
            Some((owner, stock)) if owner == session.id => record.product.with_stock(stock),
            _ => record.product.clone(),
        }))
    }

    async fn create(
        &self,
        ctx: &mut TransactionContext<InMemorySession>,
        product: &Product,
    ) -> Result<(), StoreError> {
        let session = ctx.session()?;
        let mut state = self.lock()?;
        ensure_open(&state, session)?;

        let id = product.id_typed();
        let already_staged = state
            .sessions
            .values()
            .any(|s| s.products.contains_key(&id));
        if state.products.contains_key(&id) || already_staged {
            return Err(StoreError::Constraint(format!("product {id} already exists")));
        }

        let stored = product.with_stock(product.stock());
        if let Some(staged) = state.sessions.get_mut(&session.id) {
            staged.products.insert(id, stored);
        }
        Ok(())
    }

    async fn update_stock(
        &self,
        ctx: &mut TransactionContext<InMemorySession>,
        id: ProductId,
        change: i64,
    ) -> Result<i64, StoreError> {
        let session = ctx.session()?;
        if change == 0 {
            return Err(StoreError::InvalidStockChange(format!(
                "stock change for product {id} cannot be zero"
            )));
        }

        let mut state = self.lock()?;
        ensure_open(&state, session)?;

        if let Some(staged) = state
            .sessions
            .get_mut(&session.id)
            .and_then(|s| s.products.get_mut(&id))
        {
            let new_stock = apply_change(id, staged.stock(), change)?;
            *staged = staged.with_stock(new_stock);
            return Ok(new_stock);
        }

        let record = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;

        let current = match record.pending_stock {
            Some((owner, _)) if owner != session.id => {
                return Err(StoreError::WriteConflict(format!(
                    "product {id} has an uncommitted write from another transaction"
                )));
            }
            Some((_, stock)) => stock,
            None => record.product.stock(),
        };

        let new_stock = apply_change(id, current, change)?;
        record.pending_stock = Some((session.id, new_stock));
        Ok(new_stock)
    }
}

fn apply_change(id: ProductId, current: i64, change: i64) -> Result<i64, StoreError> {
    if change < 0 {
        let requested = change.saturating_neg();
        if current < requested {
            return Err(StoreError::StockConditionFailed {
                product_id: id,
                available: current,
                requested,
            });
        }
        return Ok(current - requested);
    }

    match current.checked_add(change) {
        Some(stock) if stock <= MAX_STOCK => Ok(stock),
        _ => Err(StoreError::Constraint(format!(
            "stock of product {id} would exceed {MAX_STOCK}"
        ))),
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    type Session = InMemorySession;

    async fn create(
        &self,
        ctx: &mut TransactionContext<InMemorySession>,
        order: &Order,
    ) -> Result<(), StoreError> {
        let session = ctx.session()?;
        let mut state = self.lock()?;
        ensure_open(&state, session)?;

        let id = order.id_typed();
        let already_staged = state.sessions.values().any(|s| s.orders.contains_key(&id));
        if state.orders.contains_key(&id) || already_staged {
            return Err(StoreError::Constraint(format!("order {id} already exists")));
        }

        let stored = Order::load(
            id,
            order.customer_id(),
            order.items().to_vec(),
            order.pricing().clone(),
            order.created_at(),
        );
        if let Some(staged) = state.sessions.get_mut(&session.id) {
            staged.orders.insert(id, stored);
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        ctx: &mut TransactionContext<InMemorySession>,
        id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        let state = self.lock()?;
        if let Some(session) = ctx.session_if_available() {
            if let Some(order) = state
                .sessions
                .get(&session.id)
                .and_then(|s| s.orders.get(&id))
            {
                return Ok(Some(order.clone()));
            }
        }
        Ok(state.orders.get(&id).cloned())
    }
}

#[async_trait]
impl ConsumerDirectory for InMemoryStore {
    async fn find_location(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CustomerLocation>, StoreError> {
        Ok(self.lock()?.consumers.get(&customer_id).copied())
    }
}
