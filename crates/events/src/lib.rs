//! Domain event contracts and in-process publication.
//!
//! Events here are notifications: they are produced by aggregate state
//! transitions and released to subscribers after the owning transaction
//! commits. Nothing is rebuilt from them.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::{DomainEvent, Event};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
