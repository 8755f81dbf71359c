//! Core types: Price in integer ticks, OrderId, Quantity, Timestamp

use std::fmt;

/// Number of price ticks per one display-price unit.
///
/// A tick is 1/10,000 of a unit, so `100.2857` is `1_002_857` ticks.
pub const TICKS_PER_UNIT: i64 = 10_000;

/// Price in integer ticks.
///
/// Prices cross the API boundary as decimals but are held internally as
/// signed 64-bit tick counts. All comparison, arithmetic, and equality in
/// the book and engine happens on tick integers; floats appear only at the
/// conversion edge.
///
/// ```
/// use tickbook::Price;
///
/// let px = Price::from_f64(100.2857);
/// assert_eq!(px, Price(1_002_857));
/// assert_eq!(format!("{px}"), "100.2857");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Convert a display price to ticks, rounding half away from zero.
    pub fn from_f64(price: f64) -> Self {
        Price((price * TICKS_PER_UNIT as f64).round() as i64)
    }

    /// Convert ticks back to a display price.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_UNIT as f64
    }

    /// Returns true for prices a limit order may carry (strictly positive).
    #[inline]
    pub fn is_valid_limit(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

/// Quantity of units in an order or trade. Strictly positive in any resting
/// order or emitted trade; aggregates widen to `i64`/`u64`.
pub type Quantity = i32;

/// Timestamp in nanoseconds, supplied externally on replay rows.
/// The engine itself has no clock.
pub type Timestamp = u64;

/// Unique order identifier, assigned by the caller. Positive, and unique
/// across both sides of the book.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderId(pub i32);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ordering() {
        assert!(Price(100) < Price(200));
        assert!(Price(-50) < Price(50));
        assert_eq!(Price(1_000_000), Price(1_000_000));
    }

    #[test]
    fn from_f64_rounds_half_away_from_zero() {
        assert_eq!(Price::from_f64(100.2857), Price(1_002_857));
        assert_eq!(Price::from_f64(101.0), Price(1_010_000));
        assert_eq!(Price::from_f64(0.00005), Price(1));
        assert_eq!(Price::from_f64(-0.00005), Price(-1));
    }

    #[test]
    fn round_trip_within_half_tick() {
        for &px in &[0.0001, 1.0, 99.9999, 100.2857, 12345.6789] {
            let ticks = Price::from_f64(px);
            assert!((ticks.to_f64() - px).abs() <= 0.5 / TICKS_PER_UNIT as f64);
        }
    }

    #[test]
    fn display_four_decimals() {
        assert_eq!(format!("{}", Price(1_002_857)), "100.2857");
        assert_eq!(format!("{}", Price(1_010_000)), "101.0000");
        assert_eq!(format!("{}", Price(5)), "0.0005");
    }

    #[test]
    fn valid_limit_prices() {
        assert!(Price(1).is_valid_limit());
        assert!(!Price::ZERO.is_valid_limit());
        assert!(!Price(-100).is_valid_limit());
    }

    #[test]
    fn order_id_display() {
        assert_eq!(format!("{}", OrderId(42)), "42");
    }
}
