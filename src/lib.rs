//! # tickbook
//!
//! A deterministic limit order book matching engine with an event-driven
//! execution backtester on top.
//!
//! ## Features
//!
//! - **Order types**: Limit and Market, GTC and IOC time-in-force
//! - **Price-time priority**: FIFO matching at each price level, trades at
//!   the resting order's price
//! - **Integer tick prices**: 1/10,000 of a unit, no floats in the hot path
//! - **Event log**: every book mutation numbered gap-free for incremental
//!   market-data consumers
//! - **Replay**: drive the engine from recorded NEW/CANCEL/REPLACE streams
//! - **Execution backtesting**: TWAP and VWAP child-order scheduling with
//!   Transaction Cost Analysis against an arrival benchmark
//!
//! ## Quick start
//!
//! ```
//! use tickbook::{MatchingEngine, Order, OrderId, Price, Side, TimeInForce};
//!
//! let mut engine = MatchingEngine::new();
//!
//! // A resting bid...
//! let result = engine.submit(Order::limit(
//!     OrderId(1), Side::Buy, Price::from_f64(101.0), 10, TimeInForce::Gtc,
//! ));
//! assert!(result.accepted);
//! assert!(result.trades.is_empty());
//!
//! // ...and a crossing sell: executes at the resting price.
//! let result = engine.submit(Order::limit(
//!     OrderId(2), Side::Sell, Price::from_f64(100.0), 6, TimeInForce::Gtc,
//! ));
//! assert_eq!(result.trades.len(), 1);
//! assert_eq!(result.trades[0].price, Price::from_f64(101.0));
//! assert_eq!(result.trades[0].quantity, 6);
//!
//! // The bid keeps its residual on the book.
//! assert_eq!(engine.bids().find(OrderId(1)).unwrap().quantity, 4);
//! ```
//!
//! ## Market data
//!
//! ```
//! use tickbook::{MatchingEngine, Order, OrderId, Price, Side, TimeInForce};
//!
//! let mut engine = MatchingEngine::new();
//! engine.submit(Order::limit(OrderId(1), Side::Buy, Price::from_f64(99.0), 100, TimeInForce::Gtc));
//! engine.submit(Order::limit(OrderId(2), Side::Buy, Price::from_f64(100.0), 200, TimeInForce::Gtc));
//! engine.submit(Order::limit(OrderId(3), Side::Sell, Price::from_f64(101.0), 150, TimeInForce::Gtc));
//!
//! let top = engine.top_of_book();
//! assert_eq!(top.best_bid.unwrap().price, Price::from_f64(100.0));
//! assert_eq!(top.spread_ticks(), Some(10_000));
//!
//! let depth = engine.depth(10);
//! assert_eq!(depth.bids.len(), 2);
//!
//! // Incremental event feed: remember the last seq seen, poll for the rest.
//! let cursor = engine.last_seq_num();
//! engine.cancel(OrderId(1));
//! assert_eq!(engine.events_since(cursor).len(), 1);
//! ```
//!
//! ## Backtesting
//!
//! ```
//! use tickbook::backtest::{run_backtest, BacktestConfig, ExecutionStrategy};
//! use tickbook::replay::{ReplayAction, ReplayRow};
//! use tickbook::{Order, OrderId, Price, Side, TimeInForce};
//!
//! let rows: Vec<ReplayRow> = (0..4)
//!     .map(|i| ReplayRow {
//!         ts_ns: i * 1_000,
//!         seq: i,
//!         arrival_index: i as usize,
//!         action: ReplayAction::New(Order::limit(
//!             OrderId(i as i32 + 1), Side::Sell, Price::from_f64(100.0), 5, TimeInForce::Gtc,
//!         )),
//!     })
//!     .collect();
//!
//! let config = BacktestConfig::new(Side::Buy, 8, 4, ExecutionStrategy::Twap);
//! let result = run_backtest(rows, &config).unwrap();
//! assert_eq!(result.tca.filled_quantity, 8);
//! assert!((result.tca.fill_rate - 1.0).abs() < 1e-12);
//! ```

pub mod backtest;
pub mod batch;
mod book;
pub mod csv_io;
mod engine;
mod error;
mod events;
mod level;
mod order;
pub mod replay;
mod result;
mod side;
mod snapshot;
mod tif;
mod trade;
mod types;

// Re-export the engine-level API at the crate root
pub use book::BookSide;
pub use engine::MatchingEngine;
pub use error::{Error, Result};
pub use events::{BookEvent, BookEventKind};
pub use level::Level;
pub use order::{Order, OrderType};
pub use result::{RejectReason, SubmitResult};
pub use side::Side;
pub use snapshot::{BookLevel, BookSnapshot, TopOfBook};
pub use tif::TimeInForce;
pub use trade::Trade;
pub use types::{OrderId, Price, Quantity, Timestamp, TICKS_PER_UNIT};
