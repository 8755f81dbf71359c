//! Time-in-force: controls whether unfilled quantity may rest on the book

use std::fmt;
use std::str::FromStr;

/// Time-in-force of an order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeInForce {
    /// Good-til-cancelled: residual quantity rests on the book.
    #[default]
    Gtc,
    /// Immediate-or-cancel: fill what crosses now, drop the remainder.
    Ioc,
}

impl TimeInForce {
    /// Returns true if residual quantity may rest on the book.
    #[inline]
    pub fn can_rest(self) -> bool {
        matches!(self, TimeInForce::Gtc)
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
        }
    }
}

impl FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Empty is the CSV shorthand for the default.
            "" | "GTC" => Ok(TimeInForce::Gtc),
            "IOC" => Ok(TimeInForce::Ioc),
            other => Err(format!("invalid tif '{other}' (expected GTC or IOC)")),
        }
    }
}
