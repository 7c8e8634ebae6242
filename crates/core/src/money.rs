//! Money value object (fixed-point, two decimals, never negative).

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of decimal places kept by every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round half-up (away from zero) to cents.
///
/// Exposed for signed amounts that are not `Money` (e.g. a regional adjustment).
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Non-negative monetary amount, rounded to cents on construction.
///
/// Single currency. All arithmetic returns a new value and re-checks
/// the non-negative invariant, so a `Money` that exists is always valid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Build from an exact decimal; fails with `InvalidAmount` if negative.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::invalid_amount(format!(
                "money amount cannot be negative (got {amount})"
            )));
        }
        Ok(Self(round_cents(amount)))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Build from an integer number of cents (always valid).
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from(cents) / Decimal::ONE_HUNDRED)
    }

    /// Parse a textual decimal (e.g. `"19.99"`).
    pub fn parse(s: &str) -> DomainResult<Self> {
        let amount = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::invalid_amount(format!("'{s}' is not a decimal: {e}")))?;
        Self::new(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: &Money) -> DomainResult<Money> {
        let sum = self
            .0
            .checked_add(other.0)
            .ok_or_else(|| DomainError::invalid_amount("money addition overflowed"))?;
        Money::new(sum)
    }

    /// Fails with `InvalidAmount` when `other` is larger than `self`.
    pub fn subtract(&self, other: &Money) -> DomainResult<Money> {
        let difference = self.0 - other.0;
        if difference.is_sign_negative() && !difference.is_zero() {
            return Err(DomainError::invalid_amount(format!(
                "subtraction resulted in negative money amount ({} - {})",
                self.0, other.0
            )));
        }
        Money::new(difference)
    }

    /// Fails with `InvalidAmount` for a negative multiplier.
    pub fn multiply(&self, multiplier: Decimal) -> DomainResult<Money> {
        if multiplier.is_sign_negative() && !multiplier.is_zero() {
            return Err(DomainError::invalid_amount(format!(
                "cannot multiply money by a negative number ({multiplier})"
            )));
        }
        let product = self
            .0
            .checked_mul(multiplier)
            .ok_or_else(|| DomainError::invalid_amount("money multiplication overflowed"))?;
        Money::new(product)
    }

    /// Multiply by an integer quantity.
    pub fn times(&self, quantity: i64) -> DomainResult<Money> {
        self.multiply(Decimal::from(quantity))
    }
}

impl ValueObject for Money {}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
