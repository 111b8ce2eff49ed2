//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**; two instances with
/// the same attributes are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A non-negative amount in the smallest currency unit (cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Whole currency units (e.g. dollars).
    pub fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(100))
    }

    pub fn cents(&self) -> u64 {
        self.0
    }
}

impl ValueObject for Money {}

/// Renders as `units.cents`, always with two decimals (`10.00`, `499.95`).
impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Money::from_units(10).to_string(), "10.00");
        assert_eq!(Money::from_cents(49_995).to_string(), "499.95");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    proptest! {
        #[test]
        fn display_preserves_amount(cents in 0u64..10_000_000u64) {
            let rendered = Money::from_cents(cents).to_string();
            let (units, fraction) = rendered.split_once('.').unwrap();
            prop_assert_eq!(fraction.len(), 2);
            let back = units.parse::<u64>().unwrap() * 100 + fraction.parse::<u64>().unwrap();
            prop_assert_eq!(back, cents);
        }
    }
}
