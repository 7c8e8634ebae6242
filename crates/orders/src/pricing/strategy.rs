use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use storefront_core::{Money, ProductId, money::round_cents};
use storefront_inventory::{ProductCategory, ProductSnapshot};

/// One priced line as seen by the pricing engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PricingItem {
    pub product_id: ProductId,
    pub price: Money,
    pub quantity: i64,
    pub category: ProductCategory,
}

impl PricingItem {
    pub fn from_snapshot(snapshot: &ProductSnapshot, quantity: i64) -> Self {
        Self {
            product_id: snapshot.id,
            price: snapshot.price,
            quantity,
            category: snapshot.category,
        }
    }

    /// Exact line total (`price × quantity`), not rounded.
    pub fn line_total(&self) -> Decimal {
        self.price.amount() * Decimal::from(self.quantity)
    }
}

/// Calendar day without the year, rendered `MM-DD`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DateKey {
    month: u32,
    day: u32,
}

impl DateKey {
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.month(), date.day())
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl core::fmt::Display for DateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Shared input handed to every strategy for one quote.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub items: &'a [PricingItem],
    /// Base total after the regional multiplier, rounded to cents.
    pub adjusted_total: Decimal,
    pub total_quantity: i64,
    pub date_key: DateKey,
}

/// Savings offered by a strategy, with the label shown on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    savings: Decimal,
    label: String,
}

impl Discount {
    pub const NONE_LABEL: &'static str = "none";

    /// Savings are rounded half-up to cents; negative savings count as none.
    pub fn new(savings: Decimal, label: impl Into<String>) -> Self {
        if savings <= Decimal::ZERO {
            return Self::none();
        }
        Self {
            savings: round_cents(savings),
            label: label.into(),
        }
    }

    pub fn none() -> Self {
        Self {
            savings: Decimal::ZERO,
            label: Self::NONE_LABEL.to_string(),
        }
    }

    pub fn savings(&self) -> Decimal {
        self.savings
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn into_label(self) -> String {
        self.label
    }
}

/// A pluggable discount rule.
///
/// Strategies are independent: each looks at the same context and reports
/// what it would save. Selecting among them is the engine's job.
pub trait DiscountStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &PricingContext<'_>) -> Discount;
}
