//! Infrastructure layer: configuration, storage backends, application
//! services, event publication and background workers.

pub mod config;
pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod publisher;
pub mod repositories;
pub mod services;
pub mod unit_of_work;
pub mod workers;

mod integration_tests;

pub use config::{AppConfig, ConfigError, DatabaseConfig, IsolationLevel};
pub use error::{ServiceError, StoreError};
pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use publisher::{EventPublisher, JsonEnvelope};
pub use services::{InventoryService, NewProduct, OrderPlacementService, OrderRequestItem};
pub use unit_of_work::{TransactionContext, UnitOfWork, with_transaction};
pub use workers::{EventLogWorker, WorkerHandle};
