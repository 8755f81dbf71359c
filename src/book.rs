//! BookSide: one side of the limit order book.
//!
//! Combines the sorted price levels with the order index for that side:
//! - levels in a `BTreeMap` keyed by price, best price cached for O(1) BBO
//! - an `FxHashMap` from order id to the live order, which doubles as the
//!   id -> price locator for cancellation

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::snapshot::BookLevel;
use crate::{Level, Order, OrderId, Price, Quantity, Side};

/// One side of the book (all bids or all asks).
///
/// - **Bids**: best = highest price
/// - **Asks**: best = lowest price
///
/// The order index holds the authoritative remaining quantity of every
/// resting order; level queues carry only ids. An id is indexed here if and
/// only if the order is resting on this side.
#[derive(Clone, Debug)]
pub struct BookSide {
    side: Side,
    /// Price levels, sorted by price
    levels: BTreeMap<Price, Level>,
    /// Cached best price for O(1) access
    best_price: Option<Price>,
    /// Resting orders indexed by id
    orders: FxHashMap<OrderId, Order>,
}

impl BookSide {
    /// Create an empty side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            best_price: None,
            orders: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of resting orders on this side.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of distinct price levels.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if an order with this id rests on this side.
    #[inline]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Look up a resting order by id.
    pub fn find(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Best price on this side (highest bid / lowest ask). O(1), cached.
    #[inline]
    pub fn best_price(&self) -> Option<Price> {
        self.best_price
    }

    /// The order at the front of the best level's queue.
    pub fn best_order(&self) -> Option<&Order> {
        let level = self.levels.get(&self.best_price?)?;
        self.orders.get(&level.front()?)
    }

    /// The best level as a price/aggregate-quantity pair.
    pub fn best_level(&self) -> Option<BookLevel> {
        let price = self.best_price?;
        let level = self.levels.get(&price)?;
        Some(BookLevel {
            price,
            quantity: level.total_quantity(),
        })
    }

    /// Add an order at the tail of its price level, creating the level if
    /// needed.
    ///
    /// # Panics
    ///
    /// Panics if the id is already indexed on this side. The engine checks
    /// for duplicates across both sides before calling.
    pub fn add(&mut self, order: Order) {
        assert!(
            !self.orders.contains_key(&order.id),
            "order {} already on {} side",
            order.id,
            self.side
        );

        let price = order.price;
        let quantity = order.quantity;
        let order_id = order.id;
        self.orders.insert(order_id, order);

        self.update_best_after_insert(price);
        self.levels
            .entry(price)
            .or_insert_with(|| Level::new(price))
            .push_back(order_id, quantity);
    }

    /// Remove an order by id, returning it. Deletes the level if its queue
    /// empties. O(1) average index lookup plus a scan of one level's queue.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&order_id)?;

        if let Some(level) = self.levels.get_mut(&order.price) {
            level.remove(order_id, order.quantity);
            if level.is_empty() {
                self.remove_level(order.price);
            }
        }

        Some(order)
    }

    /// Remove an order by id; returns whether it was present.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        self.remove(order_id).is_some()
    }

    /// Remove the front order of the best level after it has been fully
    /// matched. No-op on an empty side.
    pub fn consume_best(&mut self) {
        let Some(price) = self.best_price else {
            return;
        };
        let Some(level) = self.levels.get_mut(&price) else {
            return;
        };

        if let Some(front_id) = level.front() {
            let quantity = self
                .orders
                .remove(&front_id)
                .map_or(0, |order| order.quantity);
            level.pop_front(quantity);
        }

        if level.is_empty() {
            self.remove_level(price);
        }
    }

    /// Partially fill the front order of the best level.
    ///
    /// The fill must be strictly smaller than the front order's remaining
    /// quantity; a full fill goes through [`BookSide::consume_best`].
    pub fn reduce_best(&mut self, fill: Quantity) {
        let Some(price) = self.best_price else {
            return;
        };
        let Some(front_id) = self.levels.get(&price).and_then(Level::front) else {
            return;
        };

        if let Some(order) = self.orders.get_mut(&front_id) {
            order.quantity -= fill;
        }
        if let Some(level) = self.levels.get_mut(&price) {
            level.reduce(fill);
        }
    }

    /// Shrink a resting order's quantity in place, preserving its queue
    /// position. Returns false if the id is not on this side.
    pub fn reduce_quantity(&mut self, order_id: OrderId, new_quantity: Quantity) -> bool {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return false;
        };

        let delta = order.quantity - new_quantity;
        order.quantity = new_quantity;
        let price = order.price;

        if let Some(level) = self.levels.get_mut(&price) {
            level.reduce(delta);
        }
        true
    }

    /// Up to `n` best levels with aggregate quantities, best first.
    pub fn depth(&self, n: usize) -> Vec<BookLevel> {
        self.iter_best_to_worst()
            .take(n)
            .map(|level| BookLevel {
                price: level.price(),
                quantity: level.total_quantity(),
            })
            .collect()
    }

    /// Iterate levels from best to worst price.
    pub fn iter_best_to_worst(&self) -> impl Iterator<Item = &Level> {
        BestToWorstIter {
            inner: match self.side {
                Side::Buy => IterDirection::Reverse(self.levels.values().rev()),
                Side::Sell => IterDirection::Forward(self.levels.values()),
            },
        }
    }

    fn remove_level(&mut self, price: Price) {
        self.levels.remove(&price);
        if self.best_price == Some(price) {
            self.recompute_best();
        }
    }

    fn recompute_best(&mut self) {
        self.best_price = match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        };
    }

    fn update_best_after_insert(&mut self, new_price: Price) {
        match self.best_price {
            None => self.best_price = Some(new_price),
            Some(current) => {
                let is_better = match self.side {
                    Side::Buy => new_price > current,
                    Side::Sell => new_price < current,
                };
                if is_better {
                    self.best_price = Some(new_price);
                }
            }
        }
    }
}

enum IterDirection<F, R> {
    Forward(F),
    Reverse(R),
}

type LevelValues<'a> = std::collections::btree_map::Values<'a, Price, Level>;

struct BestToWorstIter<'a> {
    inner: IterDirection<LevelValues<'a>, std::iter::Rev<LevelValues<'a>>>,
}

impl<'a> Iterator for BestToWorstIter<'a> {
    type Item = &'a Level;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterDirection::Forward(iter) => iter.next(),
            IterDirection::Reverse(iter) => iter.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeInForce;

    fn gtc(id: i32, side: Side, price: i64, qty: Quantity) -> Order {
        Order::limit(OrderId(id), side, Price(price), qty, TimeInForce::Gtc)
    }

    #[test]
    fn new_side_is_empty() {
        let bids = BookSide::new(Side::Buy);

        assert!(bids.is_empty());
        assert_eq!(bids.order_count(), 0);
        assert_eq!(bids.level_count(), 0);
        assert_eq!(bids.best_price(), None);
        assert!(bids.best_order().is_none());
    }

    #[test]
    fn bids_best_is_highest() {
        let mut bids = BookSide::new(Side::Buy);

        bids.add(gtc(1, Side::Buy, 1_000_000, 10));
        assert_eq!(bids.best_price(), Some(Price(1_000_000)));

        bids.add(gtc(2, Side::Buy, 990_000, 10));
        assert_eq!(bids.best_price(), Some(Price(1_000_000)));

        bids.add(gtc(3, Side::Buy, 1_010_000, 10));
        assert_eq!(bids.best_price(), Some(Price(1_010_000)));
    }

    #[test]
    fn asks_best_is_lowest() {
        let mut asks = BookSide::new(Side::Sell);

        asks.add(gtc(1, Side::Sell, 1_000_000, 10));
        asks.add(gtc(2, Side::Sell, 1_010_000, 10));
        assert_eq!(asks.best_price(), Some(Price(1_000_000)));

        asks.add(gtc(3, Side::Sell, 990_000, 10));
        assert_eq!(asks.best_price(), Some(Price(990_000)));
    }

    #[test]
    fn remove_returns_order_and_drops_empty_level() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(gtc(1, Side::Buy, 1_000_000, 10));
        bids.add(gtc(2, Side::Buy, 990_000, 20));

        let removed = bids.remove(OrderId(1)).unwrap();
        assert_eq!(removed.quantity, 10);
        assert_eq!(bids.level_count(), 1);
        assert_eq!(bids.best_price(), Some(Price(990_000)));
        assert!(!bids.contains(OrderId(1)));
    }

    #[test]
    fn remove_missing_is_none() {
        let mut bids = BookSide::new(Side::Buy);
        assert!(bids.remove(OrderId(99)).is_none());
        assert!(!bids.cancel(OrderId(99)));
    }

    #[test]
    fn remove_keeps_level_with_remaining_orders() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(gtc(1, Side::Buy, 1_000_000, 10));
        bids.add(gtc(2, Side::Buy, 1_000_000, 20));

        assert!(bids.cancel(OrderId(1)));
        assert_eq!(bids.level_count(), 1);
        assert_eq!(bids.best_level().unwrap().quantity, 20);
        assert_eq!(bids.best_order().unwrap().id, OrderId(2));
    }

    #[test]
    fn consume_best_pops_fifo() {
        let mut asks = BookSide::new(Side::Sell);
        asks.add(gtc(1, Side::Sell, 1_000_000, 10));
        asks.add(gtc(2, Side::Sell, 1_000_000, 20));

        asks.consume_best();
        assert_eq!(asks.best_order().unwrap().id, OrderId(2));
        assert_eq!(asks.best_level().unwrap().quantity, 20);

        asks.consume_best();
        assert!(asks.is_empty());
        assert_eq!(asks.best_price(), None);
    }

    #[test]
    fn consume_best_advances_to_next_level() {
        let mut asks = BookSide::new(Side::Sell);
        asks.add(gtc(1, Side::Sell, 1_000_000, 10));
        asks.add(gtc(2, Side::Sell, 1_010_000, 20));

        asks.consume_best();
        assert_eq!(asks.best_price(), Some(Price(1_010_000)));
    }

    #[test]
    fn reduce_best_partial_fill() {
        let mut asks = BookSide::new(Side::Sell);
        asks.add(gtc(1, Side::Sell, 1_000_000, 10));

        asks.reduce_best(4);

        assert_eq!(asks.best_order().unwrap().quantity, 6);
        assert_eq!(asks.best_level().unwrap().quantity, 6);
        assert_eq!(asks.find(OrderId(1)).unwrap().quantity, 6);
    }

    #[test]
    fn reduce_quantity_preserves_position() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(gtc(1, Side::Buy, 1_000_000, 10));
        bids.add(gtc(2, Side::Buy, 1_000_000, 20));

        assert!(bids.reduce_quantity(OrderId(1), 4));

        assert_eq!(bids.best_order().unwrap().id, OrderId(1));
        assert_eq!(bids.best_order().unwrap().quantity, 4);
        assert_eq!(bids.best_level().unwrap().quantity, 24);
        assert!(!bids.reduce_quantity(OrderId(99), 1));
    }

    #[test]
    fn depth_is_best_first() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(gtc(1, Side::Buy, 990_000, 10));
        bids.add(gtc(2, Side::Buy, 1_010_000, 20));
        bids.add(gtc(3, Side::Buy, 1_000_000, 30));
        bids.add(gtc(4, Side::Buy, 1_000_000, 5));

        let depth = bids.depth(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].price, Price(1_010_000));
        assert_eq!(depth[0].quantity, 20);
        assert_eq!(depth[1].price, Price(1_000_000));
        assert_eq!(depth[1].quantity, 35);
    }

    #[test]
    fn depth_on_asks_ascending() {
        let mut asks = BookSide::new(Side::Sell);
        asks.add(gtc(1, Side::Sell, 1_020_000, 10));
        asks.add(gtc(2, Side::Sell, 1_000_000, 20));
        asks.add(gtc(3, Side::Sell, 1_010_000, 30));

        let prices: Vec<_> = asks.depth(10).iter().map(|l| l.price).collect();
        assert_eq!(
            prices,
            vec![Price(1_000_000), Price(1_010_000), Price(1_020_000)]
        );
    }

    #[test]
    #[should_panic(expected = "already on")]
    fn duplicate_add_panics() {
        let mut bids = BookSide::new(Side::Buy);
        bids.add(gtc(1, Side::Buy, 1_000_000, 10));
        bids.add(gtc(1, Side::Buy, 990_000, 5));
    }
}
