//! Value object trait: equality by value, not identity.
//!
//! `Money` and `OrderItem` are the value objects of this domain: immutable, built
//! through validating constructors, and compared attribute by attribute. To
//! "change" one, build a new one (`Money::add` returns a fresh value).

/// Marker trait for value objects.
///
/// Requires `Clone + PartialEq + Debug` so values can be copied freely into
/// events and compared in tests.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
