//! Money type for merchandise prices.
//!
//! Tunila sells in Nepalese rupees. Prices are carried as decimal rupees for
//! storage and display, and converted to integer paisa (1 NPR = 100 paisa)
//! at the payment-gateway boundary, which only accepts minor units.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur constructing or converting [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is negative.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount does not fit the gateway's integer paisa representation.
    #[error("amount too large for paisa conversion")]
    Overflow,
}

/// An amount of Nepalese rupees.
///
/// Wraps a `Decimal` so arithmetic stays exact; the tenth paisa never exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Create a new amount from decimal rupees.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if the amount is below zero.
    pub fn new(rupees: Decimal) -> Result<Self, MoneyError> {
        if rupees.is_sign_negative() {
            return Err(MoneyError::Negative);
        }
        Ok(Self(rupees))
    }

    /// Create an amount from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The amount in decimal rupees.
    #[must_use]
    pub const fn rupees(&self) -> Decimal {
        self.0
    }

    /// Convert a unit price to total paisa for a quantity of items.
    ///
    /// Matches the gateway arithmetic of the payment flow: the unit price is
    /// converted to paisa first (rounded half-up to the nearest paisa), then
    /// multiplied by the quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the total does not fit in `u64`.
    pub fn total_paisa(&self, quantity: u32) -> Result<u64, MoneyError> {
        let unit_paisa = self
            .0
            .checked_mul(Decimal::from(100))
            .ok_or(MoneyError::Overflow)?
            .round()
            .to_u64()
            .ok_or(MoneyError::Overflow)?;
        unit_paisa
            .checked_mul(u64::from(quantity))
            .ok_or(MoneyError::Overflow)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rs {:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_rejects_negative() {
        let amount = Decimal::new(-100, 2);
        assert_eq!(Money::new(amount), Err(MoneyError::Negative));
    }

    #[test]
    fn test_whole_rupees_to_paisa() {
        let price = Money::from_rupees(1500);
        assert_eq!(price.total_paisa(1).unwrap(), 150_000);
        assert_eq!(price.total_paisa(3).unwrap(), 450_000);
    }

    #[test]
    fn test_fractional_price_rounds_per_unit() {
        // Rs 19.999 -> 2000 paisa per unit, then multiplied
        let price = Money::new(Decimal::new(19_999, 3)).unwrap();
        assert_eq!(price.total_paisa(2).unwrap(), 4000);
    }

    #[test]
    fn test_zero_quantity() {
        let price = Money::from_rupees(500);
        assert_eq!(price.total_paisa(0).unwrap(), 0);
    }

    #[test]
    fn test_overflow() {
        let price = Money::new(Decimal::MAX).unwrap();
        assert_eq!(price.total_paisa(2), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_display() {
        let price = Money::new(Decimal::new(12_345, 2)).unwrap();
        assert_eq!(price.to_string(), "Rs 123.45");
    }
}
