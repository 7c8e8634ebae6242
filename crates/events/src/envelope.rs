use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::DomainEvent;

/// Envelope for a published event: routing metadata plus the payload.
///
/// This is the unit handed to the bus once the transaction that produced the
/// event has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    aggregate_id: Uuid,
    aggregate_type: String,

    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        event_version: u32,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            event_version,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Replace the payload, keeping the metadata.
    pub fn map_payload<F, T>(self, f: F) -> EventEnvelope<T>
    where
        F: FnOnce(E) -> T,
    {
        EventEnvelope {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            event_type: self.event_type,
            event_version: self.event_version,
            occurred_at: self.occurred_at,
            payload: f(self.payload),
        }
    }
}

impl<E: DomainEvent> EventEnvelope<E> {
    /// Wrap a domain event, taking the metadata from the event itself.
    pub fn wrap(event: E) -> Self {
        Self::new(
            Uuid::now_v7(),
            event.aggregate_id(),
            event.aggregate_type(),
            event.event_type(),
            event.version(),
            event.occurred_at(),
            event,
        )
    }
}

impl<E: DomainEvent + Serialize> EventEnvelope<E> {
    /// Erase the payload type for transport (JSON payload).
    pub fn into_json(self) -> Result<EventEnvelope<serde_json::Value>, serde_json::Error> {
        let payload = serde_json::to_value(&self.payload)?;
        Ok(self.map_payload(|_| payload))
    }
}
