//! Result types for engine operations.

use std::fmt;

use crate::Trade;

/// Why an order was rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    /// Not rejected
    #[default]
    None,
    /// Limit order with a non-positive price
    InvalidPrice,
    /// Non-positive quantity
    InvalidQuantity,
    /// Order id already resting on either side
    DuplicateOrderId,
    /// Market order against an empty opposite book
    NoLiquidity,
    /// Replace target not resting on either side
    OrderNotFound,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::None => "NONE",
            RejectReason::InvalidPrice => "INVALID_PRICE",
            RejectReason::InvalidQuantity => "INVALID_QUANTITY",
            RejectReason::DuplicateOrderId => "DUPLICATE_ORDER_ID",
            RejectReason::NoLiquidity => "NO_LIQUIDITY",
            RejectReason::OrderNotFound => "ORDER_NOT_FOUND",
        };
        f.write_str(s)
    }
}

/// Outcome of `submit` or `replace`.
///
/// An accepted order may still produce zero trades (an IOC that found no
/// cross, or a GTC that rested). Rejections carry a specific reason and
/// leave the engine untouched.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmitResult {
    pub accepted: bool,
    pub reject_reason: RejectReason,
    /// Trades in execution order
    pub trades: Vec<Trade>,
}

impl SubmitResult {
    pub(crate) fn accepted() -> Self {
        Self {
            accepted: true,
            reject_reason: RejectReason::None,
            trades: Vec::new(),
        }
    }

    pub(crate) fn rejected(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reject_reason: reason,
            trades: Vec::new(),
        }
    }

    /// Total quantity executed across all trades.
    pub fn filled_quantity(&self) -> i64 {
        self.trades.iter().map(|t| t.quantity as i64).sum()
    }

    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }
}
