//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Money value object
///
/// Arithmetic keeps full precision; only [`Money::display`] truncates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn add(&self, other: &Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(Decimal::from(qty))) }

    /// The amount truncated toward zero to cents.
    pub fn display_amount(&self) -> Decimal {
        self.0.round_dp_with_strategy(2, RoundingStrategy::ToZero)
    }

    pub fn display(&self) -> String { format!("{:.2}", self.display_amount()) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.display()) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::zero(), |acc, m| acc.add(&m)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_add() {
        let a = Money::new(Decimal::new(100, 0));
        let b = Money::new(Decimal::new(50, 0));
        assert_eq!(a.add(&b).amount(), Decimal::new(150, 0));
    }
    #[test]
    fn test_display_truncates() {
        assert_eq!(Money::new(Decimal::new(19999, 3)).display(), "19.99");
        assert_eq!(Money::new(Decimal::new(5, 0)).display(), "5.00");
        assert_eq!(Money::new(Decimal::new(-1019, 3)).to_string(), "-1.01");
    }
    #[test]
    fn test_multiply_and_sum() {
        let unit = Money::new(Decimal::new(1250, 2));
        let total: Money = [unit.multiply(2), unit.multiply(1)].into_iter().sum();
        assert_eq!(total.amount(), Decimal::new(375, 1));
    }
    #[test]
    fn test_serializes_as_json_number() {
        let value = serde_json::to_value(Money::new(Decimal::new(40, 0))).unwrap();
        assert_eq!(value.as_f64(), Some(40.0));
        let back: Money = serde_json::from_value(serde_json::json!(12.5)).unwrap();
        assert_eq!(back.amount(), Decimal::new(125, 1));
    }
}
