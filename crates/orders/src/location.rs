use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::DomainError;

/// Where a consumer is based; drives regional pricing and tax.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerLocation {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EUROPE")]
    Europe,
    #[serde(rename = "ASIA")]
    Asia,
}

impl CustomerLocation {
    pub const ALL: [CustomerLocation; 3] = [
        CustomerLocation::Us,
        CustomerLocation::Europe,
        CustomerLocation::Asia,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CustomerLocation::Us => "US",
            CustomerLocation::Europe => "EUROPE",
            CustomerLocation::Asia => "ASIA",
        }
    }

    /// Multiplier applied to the base total before discounts.
    ///
    /// Europe stays at 1: its difference is expressed as VAT instead.
    pub fn price_multiplier(self) -> Decimal {
        match self {
            CustomerLocation::Us | CustomerLocation::Europe => Decimal::ONE,
            CustomerLocation::Asia => Decimal::new(95, 2),
        }
    }

    /// Tax rate applied to the discounted total.
    pub fn tax_rate(self) -> Decimal {
        match self {
            CustomerLocation::Europe => Decimal::new(15, 2),
            CustomerLocation::Us | CustomerLocation::Asia => Decimal::ZERO,
        }
    }
}

impl core::fmt::Display for CustomerLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerLocation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CustomerLocation::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown customer location '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn regional_factors() {
        assert_eq!(CustomerLocation::Us.price_multiplier(), dec!(1));
        assert_eq!(CustomerLocation::Europe.price_multiplier(), dec!(1));
        assert_eq!(CustomerLocation::Asia.price_multiplier(), dec!(0.95));
        assert_eq!(CustomerLocation::Europe.tax_rate(), dec!(0.15));
        assert!(CustomerLocation::Asia.tax_rate().is_zero());
    }

    #[test]
    fn parses_storage_form() {
        assert_eq!("europe".parse::<CustomerLocation>().unwrap(), CustomerLocation::Europe);
        assert!(matches!(
            "MARS".parse::<CustomerLocation>(),
            Err(DomainError::Validation(_))
        ));
    }
}
