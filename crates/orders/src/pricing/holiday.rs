use rust_decimal::Decimal;

use storefront_inventory::ProductCategory;

use super::strategy::{DateKey, Discount, DiscountStrategy, PricingContext};

const HOLIDAYS: [DateKey; 9] = [
    DateKey::new(1, 1),
    DateKey::new(1, 6),
    DateKey::new(5, 1),
    DateKey::new(5, 3),
    DateKey::new(8, 15),
    DateKey::new(11, 1),
    DateKey::new(11, 11),
    DateKey::new(12, 25),
    DateKey::new(12, 26),
];

/// 15% off qualifying categories on public holidays.
///
/// Only the qualifying share of the order is discounted, scaled by the same
/// regional ratio that turned the base total into the adjusted total.
#[derive(Debug, Clone)]
pub struct HolidayDiscount {
    categories: Vec<ProductCategory>,
}

impl HolidayDiscount {
    pub const LABEL: &'static str = "Holiday Sale";

    pub fn new() -> Self {
        Self {
            categories: vec![ProductCategory::Electronics, ProductCategory::Toys],
        }
    }

    pub fn is_holiday(date_key: DateKey) -> bool {
        HOLIDAYS.contains(&date_key)
    }
}

impl Default for HolidayDiscount {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscountStrategy for HolidayDiscount {
    fn name(&self) -> &'static str {
        "holiday"
    }

    fn evaluate(&self, ctx: &PricingContext<'_>) -> Discount {
        if !Self::is_holiday(ctx.date_key) {
            return Discount::none();
        }

        let base_total: Decimal = ctx.items.iter().map(|i| i.line_total()).sum();
        let qualifying_total: Decimal = ctx
            .items
            .iter()
            .filter(|i| self.categories.contains(&i.category))
            .map(|i| i.line_total())
            .sum();

        if qualifying_total.is_zero() {
            return Discount::none();
        }

        let Some(ratio) = ctx.adjusted_total.checked_div(base_total) else {
            return Discount::none();
        };

        Discount::new(qualifying_total * ratio * Decimal::new(15, 2), Self::LABEL)
    }
}
