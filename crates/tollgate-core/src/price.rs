//! Precision-safe USD amounts.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Every price in the
//! system is USD; feed values are converted at the boundary, never stored
//! in a second unit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

/// A USD amount with exact decimal precision.
///
/// Wraps `Decimal` to keep access prices and raw feed figures from being
/// mixed with unrelated numerics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdPrice(pub Decimal);

impl UsdPrice {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Apply the pricing-transform multiplier (source price -> access price).
    #[inline]
    pub fn scaled(&self, multiplier: Decimal) -> Self {
        Self(self.0 * multiplier)
    }
}

impl fmt::Display for UsdPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl FromStr for UsdPrice {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for UsdPrice {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Mul<Decimal> for UsdPrice {
    type Output = UsdPrice;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scaled_applies_multiplier() {
        let source = UsdPrice::new(dec!(0.000001));
        assert_eq!(source.scaled(dec!(10000)), UsdPrice::new(dec!(0.01)));
    }

    #[test]
    fn test_identity_multiplier_preserves_value() {
        let source = UsdPrice::new(dec!(0.02));
        assert_eq!(source.scaled(Decimal::ONE), source);
    }

    #[test]
    fn test_serde_transparent() {
        let price = UsdPrice::new(dec!(1.25));
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"1.25\"");
        let back: UsdPrice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }

    #[test]
    fn test_is_positive() {
        assert!(UsdPrice::new(dec!(0.01)).is_positive());
        assert!(!UsdPrice::ZERO.is_positive());
        assert!(!UsdPrice::new(dec!(-1)).is_positive());
    }
}
