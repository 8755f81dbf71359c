//! Recorded action streams: the row model and the engine driver.
//!
//! A replay stream is a time-ordered sequence of NEW / CANCEL / REPLACE
//! actions. Rows sort by `(ts_ns, seq, arrival_index)`, so ties on the
//! exchange timestamp fall back to the feed sequence and finally to file
//! order, which makes every replay deterministic.

use crate::{MatchingEngine, Order, OrderId, Price, Quantity, Timestamp, Trade};

/// One recorded market action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplayAction {
    /// Submit a new order
    New(Order),
    /// Cancel a resting order
    Cancel { order_id: OrderId },
    /// Replace a resting order's price and quantity
    Replace {
        order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    },
}

/// A replay row: an action plus its ordering key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayRow {
    /// Exchange timestamp in nanoseconds
    pub ts_ns: Timestamp,
    /// Feed sequence number
    pub seq: u64,
    /// Position in the source file, the final tie-break
    pub arrival_index: usize,
    pub action: ReplayAction,
}

/// Sort rows into replay order: `(ts_ns, seq, arrival_index)` ascending.
pub fn sort_rows(rows: &mut [ReplayRow]) {
    rows.sort_by_key(|row| (row.ts_ns, row.seq, row.arrival_index));
}

/// Counters accumulated while driving a stream through the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayStats {
    pub rows_processed: usize,
    pub accepted_actions: usize,
    pub rejected_actions: usize,
    pub cancel_success: usize,
    pub cancel_not_found: usize,
    pub trades_generated: usize,
}

/// A trade stamped with the row that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeRecord {
    pub ts_ns: Timestamp,
    pub seq: u64,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

impl TradeRecord {
    pub(crate) fn from_trade(row: &ReplayRow, trade: &Trade) -> Self {
        Self {
            ts_ns: row.ts_ns,
            seq: row.seq,
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            price: trade.price,
            quantity: trade.quantity,
        }
    }
}

/// Outcome of replaying a full stream.
#[derive(Clone, Debug, Default)]
pub struct ReplayResult {
    pub stats: ReplayStats,
    /// Row-driven trades in execution order
    pub trades: Vec<TradeRecord>,
}

/// Drive one row through the engine, updating the stats and returning any
/// trades it produced.
pub(crate) fn apply_row(
    engine: &mut MatchingEngine,
    row: &ReplayRow,
    stats: &mut ReplayStats,
) -> Vec<Trade> {
    stats.rows_processed += 1;

    match row.action {
        ReplayAction::New(order) => {
            let result = engine.submit(order);
            if result.accepted {
                stats.accepted_actions += 1;
            } else {
                stats.rejected_actions += 1;
            }
            stats.trades_generated += result.trades.len();
            result.trades
        }
        ReplayAction::Cancel { order_id } => {
            if engine.cancel(order_id) {
                stats.accepted_actions += 1;
                stats.cancel_success += 1;
            } else {
                stats.rejected_actions += 1;
                stats.cancel_not_found += 1;
            }
            Vec::new()
        }
        ReplayAction::Replace {
            order_id,
            new_price,
            new_quantity,
        } => {
            let result = engine.replace(order_id, new_price, new_quantity);
            if result.accepted {
                stats.accepted_actions += 1;
            } else {
                stats.rejected_actions += 1;
            }
            stats.trades_generated += result.trades.len();
            result.trades
        }
    }
}

/// Replay a pre-sorted stream against the engine, collecting stats and
/// timestamped trades.
pub fn replay_rows(engine: &mut MatchingEngine, rows: &[ReplayRow]) -> ReplayResult {
    let mut result = ReplayResult::default();

    for row in rows {
        let trades = apply_row(engine, row, &mut result.stats);
        result
            .trades
            .extend(trades.iter().map(|t| TradeRecord::from_trade(row, t)));
    }

    log::debug!(
        "replayed {} rows: {} accepted, {} rejected, {} trades",
        result.stats.rows_processed,
        result.stats.accepted_actions,
        result.stats.rejected_actions,
        result.stats.trades_generated
    );

    result
}
