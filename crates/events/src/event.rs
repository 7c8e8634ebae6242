use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - stamped with the business time they occurred at
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.product.sold").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// An event raised by a specific aggregate instance.
pub trait DomainEvent: Event {
    /// Aggregate type label (e.g. "inventory.product").
    fn aggregate_type(&self) -> &'static str;

    /// Identifier of the aggregate instance that raised the event.
    fn aggregate_id(&self) -> Uuid;
}
