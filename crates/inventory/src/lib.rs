//! Inventory domain module.
//!
//! Business rules for catalog products and their stock, implemented purely as
//! deterministic domain logic (no IO, no async, no storage).

pub mod category;
pub mod product;

pub use category::ProductCategory;
pub use product::{
    CreateProduct, MAX_PRICE_CENTS, MAX_STOCK, Product, ProductCreated, ProductEvent,
    ProductRestocked, ProductSnapshot, ProductSold,
};
