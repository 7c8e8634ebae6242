//! Post-commit event publishing.
//!
//! Services collect pending domain events inside the transaction and hand
//! them to [`EventPublisher::publish_all`] only after the commit succeeded.
//! Events are serialized into JSON envelopes so one bus carries every
//! aggregate's events.

use serde::Serialize;
use tracing::{debug, warn};

use storefront_events::{DomainEvent, EventBus, EventEnvelope, Subscription};

/// Message type carried on the application bus.
pub type JsonEnvelope = EventEnvelope<serde_json::Value>;

#[derive(Debug, Clone)]
pub struct EventPublisher<B> {
    bus: B,
}

impl<B> EventPublisher<B>
where
    B: EventBus<JsonEnvelope>,
{
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn subscribe(&self) -> Subscription<JsonEnvelope> {
        self.bus.subscribe()
    }

    /// Publish committed events in order and return how many went out.
    ///
    /// The state change is already durable, so failures are logged and the
    /// remaining events are still attempted.
    pub fn publish_all<E>(&self, events: impl IntoIterator<Item = E>) -> usize
    where
        E: DomainEvent + Serialize,
    {
        let mut published = 0;
        for event in events {
            let envelope = match EventEnvelope::wrap(event).into_json() {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(error = %err, "failed to serialize domain event; skipped");
                    continue;
                }
            };

            let event_type = envelope.event_type().to_string();
            let aggregate_id = envelope.aggregate_id();
            match self.bus.publish(envelope) {
                Ok(()) => {
                    debug!(event_type = %event_type, aggregate_id = %aggregate_id, "event published");
                    published += 1;
                }
                Err(err) => {
                    warn!(
                        event_type = %event_type,
                        aggregate_id = %aggregate_id,
                        error = %err,
                        "failed to publish committed event"
                    );
                }
            }
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use storefront_core::ProductId;
    use storefront_events::InMemoryEventBus;
    use storefront_inventory::{ProductEvent, ProductRestocked};

    #[derive(Debug)]
    struct ClosedBus;

    impl EventBus<JsonEnvelope> for ClosedBus {
        type Error = String;

        fn publish(&self, _message: JsonEnvelope) -> Result<(), String> {
            Err("bus closed".to_string())
        }

        fn subscribe(&self) -> Subscription<JsonEnvelope> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    fn restocked(product_id: ProductId) -> ProductEvent {
        ProductEvent::Restocked(ProductRestocked {
            product_id,
            quantity: 5,
            new_stock: 15,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn publishes_json_envelopes_to_subscribers() {
        let publisher = EventPublisher::new(Arc::new(InMemoryEventBus::new()));
        let sub = publisher.subscribe();
        let product_id = ProductId::new();

        assert_eq!(publisher.publish_all(vec![restocked(product_id)]), 1);

        let envelope = sub.try_recv().unwrap();
        assert_eq!(envelope.event_type(), "inventory.product.restocked");
        assert_eq!(envelope.aggregate_id(), *product_id.as_uuid());
        assert_eq!(envelope.payload()["new_stock"], 15);
    }

    #[test]
    fn publish_failures_are_counted_out_not_returned() {
        let publisher = EventPublisher::new(ClosedBus);
        let product_id = ProductId::new();

        assert_eq!(
            publisher.publish_all(vec![restocked(product_id), restocked(product_id)]),
            0
        );
    }
}
