use rust_decimal::Decimal;

use super::strategy::{DateKey, Discount, DiscountStrategy, PricingContext};

/// Flat 25% off the adjusted total on Black Friday.
///
/// The date is fixed at November 29th rather than computed per year.
#[derive(Debug, Clone, Default)]
pub struct BlackFridayDiscount;

impl BlackFridayDiscount {
    pub const DATE: DateKey = DateKey::new(11, 29);
    pub const LABEL: &'static str = "Black Friday";
}

impl DiscountStrategy for BlackFridayDiscount {
    fn name(&self) -> &'static str {
        "black_friday"
    }

    fn evaluate(&self, ctx: &PricingContext<'_>) -> Discount {
        if ctx.date_key != Self::DATE {
            return Discount::none();
        }
        Discount::new(ctx.adjusted_total * Decimal::new(25, 2), Self::LABEL)
    }
}
