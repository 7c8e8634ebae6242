use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Money, money::round_cents};

use crate::location::CustomerLocation;

use super::black_friday::BlackFridayDiscount;
use super::holiday::HolidayDiscount;
use super::strategy::{DateKey, Discount, DiscountStrategy, PricingContext, PricingItem};
use super::volume::VolumeDiscount;

/// Output of a quote; every amount is rounded half-up to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub total: Money,
    pub original_total: Money,
    /// Signed: negative when the region lowers the price.
    pub regional_adjustment: Decimal,
    pub tax_amount: Money,
    pub tax_rate: Decimal,
    pub discount_applied: String,
}

/// Prices a set of lines for a location on a given day.
///
/// Strategies are consulted in registration order; the first one offering the
/// greatest savings wins.
pub struct PricingEngine {
    strategies: Vec<Box<dyn DiscountStrategy>>,
}

impl PricingEngine {
    /// Engine without any discount strategy.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Volume, then Black Friday, then Holiday.
    pub fn with_default_strategies() -> Self {
        Self::new()
            .with_strategy(VolumeDiscount::new())
            .with_strategy(BlackFridayDiscount)
            .with_strategy(HolidayDiscount::new())
    }

    pub fn with_strategy(mut self, strategy: impl DiscountStrategy + 'static) -> Self {
        self.register(Box::new(strategy));
        self
    }

    /// Append a strategy; it loses ties against everything registered before it.
    pub fn register(&mut self, strategy: Box<dyn DiscountStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Quote using today's date.
    ///
    /// The date key is the UTC calendar date, not the host's local date.
    pub fn quote_now(
        &self,
        items: &[PricingItem],
        location: CustomerLocation,
    ) -> DomainResult<PriceBreakdown> {
        self.quote(items, location, Utc::now().date_naive())
    }

    pub fn quote(
        &self,
        items: &[PricingItem],
        location: CustomerLocation,
        date: NaiveDate,
    ) -> DomainResult<PriceBreakdown> {
        let mut original_total = Decimal::ZERO;
        let mut total_quantity: i64 = 0;
        for item in items {
            if item.quantity <= 0 {
                return Err(DomainError::invalid_quantity(format!(
                    "quantity for product {} must be positive (got {})",
                    item.product_id, item.quantity
                )));
            }
            let line_total = item
                .price
                .amount()
                .checked_mul(Decimal::from(item.quantity))
                .ok_or_else(|| DomainError::invalid_amount("line total overflowed"))?;
            original_total = original_total
                .checked_add(line_total)
                .ok_or_else(|| DomainError::invalid_amount("order total overflowed"))?;
            total_quantity = total_quantity
                .checked_add(item.quantity)
                .ok_or_else(|| DomainError::invalid_quantity("total quantity overflowed"))?;
        }

        let adjusted_total = round_cents(original_total * location.price_multiplier());
        let regional_adjustment = round_cents(adjusted_total - original_total);

        let ctx = PricingContext {
            items,
            adjusted_total,
            total_quantity,
            date_key: DateKey::from_date(date),
        };
        let best = self.best_discount(&ctx);

        let final_before_tax = adjusted_total - best.savings();
        let tax_rate = location.tax_rate();
        let tax_amount = final_before_tax * tax_rate;
        let total = final_before_tax + tax_amount;

        Ok(PriceBreakdown {
            total: Money::new(total)?,
            original_total: Money::new(original_total)?,
            regional_adjustment,
            tax_amount: Money::new(tax_amount)?,
            tax_rate,
            discount_applied: best.into_label(),
        })
    }

    fn best_discount(&self, ctx: &PricingContext<'_>) -> Discount {
        self.strategies
            .iter()
            .map(|s| s.evaluate(ctx))
            .fold(Discount::none(), |best, current| {
                if current.savings() > best.savings() {
                    current
                } else {
                    best
                }
            })
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::with_default_strategies()
    }
}

impl core::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
