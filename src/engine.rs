//! Matching engine: price-time priority execution over two book sides.
//!
//! The engine owns one [`BookSide`] per side, an append-only event log, and
//! the sequence counter. All mutation goes through `submit` / `cancel` /
//! `replace`; rejected operations leave every piece of state untouched.
//!
//! Matching rules:
//! 1. Better prices match first (higher bids, lower asks)
//! 2. At the same price, earlier orders match first (FIFO)
//! 3. Trades execute at the resting order's price

use crate::events::{BookEvent, BookEventKind};
use crate::snapshot::{BookSnapshot, TopOfBook};
use crate::{
    BookSide, Order, OrderId, OrderType, Price, Quantity, RejectReason, Side, SubmitResult, Trade,
};

/// The matching engine.
///
/// ```
/// use tickbook::{MatchingEngine, Order, OrderId, Price, Side, TimeInForce};
///
/// let mut engine = MatchingEngine::new();
/// engine.submit(Order::limit(OrderId(1), Side::Buy, Price::from_f64(101.0), 10, TimeInForce::Gtc));
/// let result = engine.submit(Order::limit(OrderId(2), Side::Sell, Price::from_f64(100.0), 6, TimeInForce::Gtc));
///
/// assert_eq!(result.trades.len(), 1);
/// assert_eq!(result.trades[0].price, Price::from_f64(101.0));
/// assert_eq!(engine.bids().find(OrderId(1)).unwrap().quantity, 4);
/// ```
#[derive(Clone, Debug)]
pub struct MatchingEngine {
    bids: BookSide,
    asks: BookSide,
    events: Vec<BookEvent>,
    next_seq_num: u64,
}

impl MatchingEngine {
    /// Create an engine with empty books and an empty event log.
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            events: Vec::new(),
            next_seq_num: 1,
        }
    }

    // === Order entry ===

    /// Submit an order.
    ///
    /// Validation, first hit wins:
    /// 1. non-positive quantity -> `InvalidQuantity`
    /// 2. limit with non-positive price -> `InvalidPrice`
    /// 3. id resting on either side -> `DuplicateOrderId`
    /// 4. market order into an empty opposite book -> `NoLiquidity`
    ///
    /// Accepted orders match against the opposite side while they cross;
    /// residual quantity of a GTC limit then rests. Market and IOC orders
    /// never rest, and an IOC that found nothing to cross is still accepted
    /// with an empty trade list.
    pub fn submit(&mut self, order: Order) -> SubmitResult {
        if order.quantity <= 0 {
            return SubmitResult::rejected(RejectReason::InvalidQuantity);
        }
        if order.order_type == OrderType::Limit && !order.price.is_valid_limit() {
            return SubmitResult::rejected(RejectReason::InvalidPrice);
        }
        if self.has_order(order.id) {
            return SubmitResult::rejected(RejectReason::DuplicateOrderId);
        }
        if order.order_type == OrderType::Market && self.opposite(order.side).is_empty() {
            return SubmitResult::rejected(RejectReason::NoLiquidity);
        }

        let mut result = SubmitResult::accepted();
        let mut incoming = order;
        self.execute(&mut incoming, &mut result);

        if incoming.quantity > 0
            && incoming.order_type == OrderType::Limit
            && incoming.tif.can_rest()
        {
            self.push_event(BookEventKind::Add {
                order_id: incoming.id,
                side: incoming.side,
                price: incoming.price,
                quantity: incoming.quantity,
            });
            self.same(incoming.side).add(incoming);
        }

        result
    }

    /// Cancel a resting order on whichever side holds it.
    ///
    /// Emits a Cancel event carrying the removed order's side, price, and
    /// remaining quantity. Returns false (and emits nothing) if no such
    /// order rests.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let removed = self
            .bids
            .remove(order_id)
            .or_else(|| self.asks.remove(order_id));

        match removed {
            Some(order) => {
                self.push_event(BookEventKind::Cancel {
                    order_id: order.id,
                    side: order.side,
                    price: order.price,
                    quantity: order.quantity,
                });
                true
            }
            None => false,
        }
    }

    /// Replace a resting order's price and quantity.
    ///
    /// Keeping the price while not increasing the quantity shrinks the order
    /// in place and preserves its queue position. Any other change removes
    /// the order and re-injects `{id, new_price, new_quantity}` as a GTC
    /// limit through [`MatchingEngine::submit`], which may cross; that
    /// submit's result is returned verbatim. In the re-injection path the
    /// Replace event precedes any Trade/Add events of the same operation.
    pub fn replace(
        &mut self,
        order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> SubmitResult {
        if new_quantity <= 0 {
            return SubmitResult::rejected(RejectReason::InvalidQuantity);
        }
        if !new_price.is_valid_limit() {
            return SubmitResult::rejected(RejectReason::InvalidPrice);
        }

        let Some(existing) = self
            .bids
            .find(order_id)
            .or_else(|| self.asks.find(order_id))
            .copied()
        else {
            return SubmitResult::rejected(RejectReason::OrderNotFound);
        };

        self.push_event(BookEventKind::Replace {
            order_id,
            side: existing.side,
            old_price: existing.price,
            old_quantity: existing.quantity,
            new_price,
            new_quantity,
        });

        if new_price == existing.price && new_quantity <= existing.quantity {
            self.same(existing.side).reduce_quantity(order_id, new_quantity);
            return SubmitResult::accepted();
        }

        // Priority-breaking: remove, then re-inject. The id is free again,
        // so the duplicate check inside submit cannot fire.
        self.same(existing.side).remove(order_id);
        self.submit(Order::limit(
            order_id,
            existing.side,
            new_price,
            new_quantity,
            crate::TimeInForce::Gtc,
        ))
    }

    // === Matching core ===

    fn crosses(order: &Order, opposite_best: Price) -> bool {
        match order.order_type {
            OrderType::Market => true,
            OrderType::Limit => match order.side {
                Side::Buy => order.price >= opposite_best,
                Side::Sell => order.price <= opposite_best,
            },
        }
    }

    fn execute(&mut self, incoming: &mut Order, result: &mut SubmitResult) {
        while incoming.quantity > 0 {
            let opposite = self.opposite(incoming.side);
            let Some(best_price) = opposite.best_price() else {
                break;
            };
            if !Self::crosses(incoming, best_price) {
                break;
            }

            let Some(resting) = opposite.best_order() else {
                break;
            };
            let resting_id = resting.id;
            let resting_quantity = resting.quantity;
            let executed = incoming.quantity.min(resting_quantity);

            let trade = Trade {
                buy_order_id: if incoming.side == Side::Buy {
                    incoming.id
                } else {
                    resting_id
                },
                sell_order_id: if incoming.side == Side::Buy {
                    resting_id
                } else {
                    incoming.id
                },
                price: best_price,
                quantity: executed,
            };
            result.trades.push(trade);
            self.push_event(BookEventKind::Trade {
                buy_order_id: trade.buy_order_id,
                sell_order_id: trade.sell_order_id,
                price: trade.price,
                quantity: trade.quantity,
            });

            incoming.quantity -= executed;
            if executed == resting_quantity {
                self.opposite_mut(incoming.side).consume_best();
            } else {
                self.opposite_mut(incoming.side).reduce_best(executed);
            }
        }
    }

    // === Market data ===

    /// Best level of each side, absent where that side is empty.
    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.bids.best_level(),
            best_ask: self.asks.best_level(),
        }
    }

    /// Up to `n` best levels per side.
    pub fn depth(&self, n: usize) -> BookSnapshot {
        BookSnapshot {
            bids: self.bids.depth(n),
            asks: self.asks.depth(n),
        }
    }

    /// Sequence number of the most recent event, 0 if none.
    pub fn last_seq_num(&self) -> u64 {
        self.next_seq_num - 1
    }

    /// All events with a sequence number greater than `seq_num`, in order.
    ///
    /// Sequence numbers are contiguous from 1, so this is a plain index into
    /// the append-only log.
    pub fn events_since(&self, seq_num: u64) -> &[BookEvent] {
        let start = (seq_num as usize).min(self.events.len());
        &self.events[start..]
    }

    /// The full event log.
    pub fn event_log(&self) -> &[BookEvent] {
        &self.events
    }

    /// Returns true if an order with this id rests on either side.
    pub fn has_order(&self, order_id: OrderId) -> bool {
        self.bids.contains(order_id) || self.asks.contains(order_id)
    }

    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    // === Internals ===

    fn same(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn opposite(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    fn opposite_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.asks,
            Side::Sell => &mut self.bids,
        }
    }

    fn push_event(&mut self, kind: BookEventKind) {
        self.events.push(BookEvent {
            seq_num: self.next_seq_num,
            kind,
        });
        self.next_seq_num += 1;
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
