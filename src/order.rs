//! Order representation

use std::fmt;
use std::str::FromStr;

use crate::{OrderId, Price, Quantity, Side, TimeInForce};

/// Order type: limit or market.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderType {
    /// Executes at `price` or better; residual may rest (GTC).
    #[default]
    Limit,
    /// Executes against whatever liquidity is present, ignoring its price
    /// field. Never rests.
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Market => write!(f, "MARKET"),
        }
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIMIT" => Ok(OrderType::Limit),
            "MARKET" => Ok(OrderType::Market),
            other => Err(format!("invalid type '{other}' (expected LIMIT or MARKET)")),
        }
    }
}

/// An order as submitted to the engine.
///
/// While resting, `quantity` is the remaining (unfilled) amount; partial
/// fills decrement it in place inside the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    /// Caller-assigned identifier, unique across both sides
    pub id: OrderId,
    /// Buy or sell
    pub side: Side,
    /// Limit price in ticks (ignored for market orders)
    pub price: Price,
    /// Remaining quantity
    pub quantity: Quantity,
    /// Whether residual quantity may rest
    pub tif: TimeInForce,
    /// Limit or market
    pub order_type: OrderType,
}

impl Order {
    /// Create a limit order.
    pub fn limit(id: OrderId, side: Side, price: Price, quantity: Quantity, tif: TimeInForce) -> Self {
        Self {
            id,
            side,
            price,
            quantity,
            tif,
            order_type: OrderType::Limit,
        }
    }

    /// Create a market order. Market orders carry no meaningful price and
    /// never rest, so they are always immediate-or-cancel.
    pub fn market(id: OrderId, side: Side, quantity: Quantity) -> Self {
        Self {
            id,
            side,
            price: Price::ZERO,
            quantity,
            tif: TimeInForce::Ioc,
            order_type: OrderType::Market,
        }
    }
}
