//! Orders domain module.
//!
//! Line items, the immutable `Order` aggregate, customer locations and the
//! pricing engine with its pluggable discount strategies. Pure domain logic:
//! no IO, no async, no storage.

pub mod location;
pub mod order;
pub mod order_item;
pub mod pricing;

pub use location::CustomerLocation;
pub use order::{Order, OrderCreated, OrderEvent, OrderLine, PlaceOrder};
pub use order_item::OrderItem;
pub use pricing::{
    BlackFridayDiscount, DateKey, Discount, DiscountStrategy, HolidayDiscount, PriceBreakdown,
    PricingContext, PricingEngine, PricingItem, VolumeDiscount,
};
