use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use storefront_events::InMemoryEventBus;
use storefront_infra::postgres::{self, PostgresStore};
use storefront_infra::{
    AppConfig, InMemoryStore, InventoryService, JsonEnvelope, OrderPlacementService,
};

/// Process-wide event bus shared by every service and the event log worker.
pub type AppBus = Arc<InMemoryEventBus<JsonEnvelope>>;

type InMemoryInventory = InventoryService<InMemoryStore, AppBus>;
type InMemoryOrders = OrderPlacementService<InMemoryStore, AppBus>;
type PersistentInventory = InventoryService<PostgresStore, AppBus>;
type PersistentOrders = OrderPlacementService<PostgresStore, AppBus>;

/// Services over the configured storage backend.
#[derive(Clone)]
pub enum AppServices {
    InMemory {
        store: InMemoryStore,
        event_bus: AppBus,
        inventory: Arc<InMemoryInventory>,
        orders: Arc<InMemoryOrders>,
    },
    Persistent {
        store: PostgresStore,
        event_bus: AppBus,
        inventory: Arc<PersistentInventory>,
        orders: Arc<PersistentOrders>,
    },
}

impl AppServices {
    pub fn in_memory(store: InMemoryStore, event_bus: AppBus) -> Self {
        Self::InMemory {
            inventory: Arc::new(InventoryService::new(store.clone(), event_bus.clone())),
            orders: Arc::new(OrderPlacementService::new(store.clone(), event_bus.clone())),
            store,
            event_bus,
        }
    }

    pub fn persistent(store: PostgresStore, event_bus: AppBus) -> Self {
        Self::Persistent {
            inventory: Arc::new(InventoryService::new(store.clone(), event_bus.clone())),
            orders: Arc::new(OrderPlacementService::new(store.clone(), event_bus.clone())),
            store,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &AppBus {
        match self {
            AppServices::InMemory { event_bus, .. } | AppServices::Persistent { event_bus, .. } => {
                event_bus
            }
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory { .. } => "in-memory",
            AppServices::Persistent { .. } => "postgres",
        }
    }
}

/// Build services for `config`: Postgres when a database is configured
/// (schema applied on start), the in-memory store otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let event_bus: AppBus = Arc::new(InMemoryEventBus::new());

    let Some(db) = &config.database else {
        info!("using in-memory store");
        return Ok(AppServices::in_memory(InMemoryStore::new(), event_bus));
    };

    let pool = postgres::connect(db)
        .await
        .context("connecting to Postgres")?;
    postgres::apply_schema(&pool)
        .await
        .context("applying database schema")?;
    info!(
        max_connections = db.max_connections,
        isolation = db.isolation_level.as_sql(),
        "using Postgres store"
    );

    Ok(AppServices::persistent(
        PostgresStore::from_config(pool, db),
        event_bus,
    ))
}
