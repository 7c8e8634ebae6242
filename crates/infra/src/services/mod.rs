//! Application services (command side).
//!
//! Each service runs one request through the same pipeline:
//!
//! ```text
//! request
//!   ↓
//! 1. Validate input (no storage touched)
//!   ↓
//! 2. Open a transaction (UnitOfWork)
//!   ↓
//! 3. Load aggregates, apply domain rules, write through repositories
//!   ↓
//! 4. Commit (or roll back on any error)
//!   ↓
//! 5. Publish the queued domain events (only after a durable commit)
//! ```
//!
//! Services are generic over a store `S` implementing the unit of work and
//! the repositories over one session type, and over an event bus `B`. Tests
//! use [`InMemoryStore`](crate::in_memory::InMemoryStore) with an
//! `InMemoryEventBus`; the binary plugs in [`PostgresStore`](crate::postgres::PostgresStore).
//!
//! Every failure leaves the store exactly as it was and surfaces as one
//! [`ServiceError`](crate::error::ServiceError).

mod inventory;
mod order_placement;

pub use inventory::{InventoryService, NewProduct};
pub use order_placement::{OrderPlacementService, OrderRequestItem};
