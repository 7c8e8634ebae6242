//! Order pricing: regional adjustment, best discount, tax.
//!
//! The engine computes a base total, applies the customer's regional
//! multiplier, asks every registered [`DiscountStrategy`] for its savings on
//! the adjusted total and keeps the strictly greatest one (earliest registered
//! wins ties), then adds tax.

mod black_friday;
mod engine;
mod holiday;
mod strategy;
mod volume;

pub use black_friday::BlackFridayDiscount;
pub use engine::{PriceBreakdown, PricingEngine};
pub use holiday::HolidayDiscount;
pub use strategy::{DateKey, Discount, DiscountStrategy, PricingContext, PricingItem};
pub use volume::VolumeDiscount;
