//! Aggregate root trait and pending-event bookkeeping.
//!
//! Aggregates in this workspace are **state-based**: they are persisted as rows,
//! not rebuilt from an event stream. Events are still produced by every state
//! transition, but only as notifications. Each aggregate owns a
//! [`PendingEvents`] queue that the application layer drains once the enclosing
//! transaction has committed.

/// Aggregate root marker + minimal interface.
///
/// Kept small on purpose: the aggregate decides how it validates and mutates its
/// own state, the trait only exposes identity and the uncommitted events.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Domain event type queued by this aggregate.
    type Event: Clone + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Events recorded since creation/load that have not been released yet.
    fn pending_events(&self) -> &[Self::Event];

    /// Remove and return all pending events.
    ///
    /// Call this only after the state change has been durably committed.
    fn take_pending_events(&mut self) -> Vec<Self::Event>;
}

/// Ordered queue of uncommitted domain events owned by an aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvents<E> {
    events: Vec<E>,
}

impl<E> PendingEvents<E> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Queue an event (appended after the already-pending ones).
    pub fn record(&mut self, event: E) {
        self.events.push(event);
    }

    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drain every pending event, preserving recording order.
    pub fn drain(&mut self) -> Vec<E> {
        core::mem::take(&mut self.events)
    }
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}
