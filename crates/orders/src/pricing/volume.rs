use rust_decimal::Decimal;

use super::strategy::{Discount, DiscountStrategy, PricingContext};

/// Tiered discount on the total number of units ordered.
#[derive(Debug, Clone)]
pub struct VolumeDiscount {
    /// `(minimum quantity, percent)`, checked from the first entry down.
    tiers: Vec<(i64, u32)>,
}

impl VolumeDiscount {
    pub fn new() -> Self {
        Self {
            tiers: vec![(50, 30), (10, 20), (5, 10)],
        }
    }
}

impl Default for VolumeDiscount {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscountStrategy for VolumeDiscount {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn evaluate(&self, ctx: &PricingContext<'_>) -> Discount {
        self.tiers
            .iter()
            .find(|(min_quantity, _)| ctx.total_quantity >= *min_quantity)
            .map(|(_, percent)| {
                Discount::new(
                    ctx.adjusted_total * Decimal::new(i64::from(*percent), 2),
                    format!("Volume {percent}%"),
                )
            })
            .unwrap_or_else(Discount::none)
    }
}
