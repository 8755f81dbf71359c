//! The engine's append-only event log.
//!
//! Every book mutation emits one event with a monotonically increasing,
//! gap-free `seq_num`. Events are never mutated after being appended, so a
//! caller that remembers the last seen sequence number can poll
//! `events_since` for an exact incremental feed.

use crate::{OrderId, Price, Quantity, Side};

/// What happened on the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BookEventKind {
    /// An order rested on the book (price/quantity are the resting residual).
    Add {
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    /// Two orders matched at the resting order's price.
    Trade {
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
    },
    /// A resting order was removed by request (fields are its state at removal).
    Cancel {
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    },
    /// A resting order was replaced, in place or by re-injection.
    Replace {
        order_id: OrderId,
        side: Side,
        old_price: Price,
        old_quantity: Quantity,
        new_price: Price,
        new_quantity: Quantity,
    },
}

impl BookEventKind {
    /// Short tag for reports and logs.
    pub fn label(&self) -> &'static str {
        match self {
            BookEventKind::Add { .. } => "ADD",
            BookEventKind::Trade { .. } => "TRADE",
            BookEventKind::Cancel { .. } => "CANCEL",
            BookEventKind::Replace { .. } => "REPLACE",
        }
    }
}

/// A numbered entry in the event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookEvent {
    /// Strictly increasing from 1, no gaps
    pub seq_num: u64,
    pub kind: BookEventKind,
}
