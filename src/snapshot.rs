//! Market-data projections: levels, top of book, depth snapshots.

use crate::Price;

/// One price level with its aggregate resting quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookLevel {
    pub price: Price,
    /// Sum of remaining quantities in the level's FIFO queue
    pub quantity: i64,
}

/// Best level of each side, either of which may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopOfBook {
    pub best_bid: Option<BookLevel>,
    pub best_ask: Option<BookLevel>,
}

impl TopOfBook {
    /// Best ask minus best bid in ticks, if both sides are present.
    pub fn spread_ticks(&self) -> Option<i64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask.price.0 - bid.price.0),
            _ => None,
        }
    }

    /// Midpoint of the best prices in ticks (integer division), if both
    /// sides are present.
    pub fn mid_ticks(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(Price((bid.price.0 + ask.price.0) / 2)),
            _ => None,
        }
    }
}

/// Up to N best levels per side, best first.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookSnapshot {
    /// Bid levels, highest price first
    pub bids: Vec<BookLevel>,
    /// Ask levels, lowest price first
    pub asks: Vec<BookLevel>,
}

impl BookSnapshot {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }
}
