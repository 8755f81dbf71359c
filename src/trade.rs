//! Trade representation

use std::fmt;

use crate::{OrderId, Price, Quantity};

/// A completed trade between a buy order and a sell order.
///
/// The price is always the resting order's price: the aggressor gets the
/// price improvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    /// Execution price in ticks (the resting order's price)
    pub price: Price,
    pub quantity: Quantity,
}

impl Trade {
    /// Returns price x quantity in tick units.
    #[inline]
    pub fn notional_ticks(&self) -> i64 {
        self.price.0 * self.quantity as i64
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (buy {} / sell {})",
            self.quantity, self.price, self.buy_order_id, self.sell_order_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notional() {
        let trade = Trade {
            buy_order_id: OrderId(1),
            sell_order_id: OrderId(2),
            price: Price(1_005_000),
            quantity: 3,
        };
        assert_eq!(trade.notional_ticks(), 3_015_000);
    }

    #[test]
    fn display() {
        let trade = Trade {
            buy_order_id: OrderId(10),
            sell_order_id: OrderId(20),
            price: Price(1_005_000),
            quantity: 7,
        };
        let s = format!("{trade}");
        assert!(s.contains("7 @ 100.5000"));
        assert!(s.contains("buy 10"));
        assert!(s.contains("sell 20"));
    }
}
