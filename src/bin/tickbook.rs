//! Command-line shell for the matching engine and backtester.
//!
//! Usage:
//!   tickbook                                        scripted demo
//!   tickbook replay <input.csv> [trades_out.csv]
//!   tickbook backtest_twap <input.csv> <BUY|SELL> <qty> <slices>
//!   tickbook backtest_vwap <input.csv> <BUY|SELL> <qty> <slices>
//!   tickbook backtest_compare <input.csv> <BUY|SELL> <qty> <slices>
//!   tickbook batch <requests.csv> <runs_out.csv> <summary_out.csv>
//!
//! Exits 0 on success, 1 on runtime failure, 2 on usage errors.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use tickbook::backtest::{
    run_backtest_csv, BacktestConfig, BacktestResult, ChildExecution, ExecutionStrategy,
};
use tickbook::batch::run_batch_csv;
use tickbook::csv_io::{load_replay_csv, write_trades_csv};
use tickbook::replay::{replay_rows, sort_rows};
use tickbook::{
    BookEventKind, BookLevel, MatchingEngine, Order, OrderId, Price, Side, SubmitResult,
    TimeInForce,
};

#[derive(Parser)]
#[command(name = "tickbook")]
#[command(about = "Deterministic limit order book matching engine and execution backtester")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Replay an action CSV and print the final book
    Replay {
        /// Action CSV to replay
        input: PathBuf,
        /// Optional trades output CSV
        trades_out: Option<PathBuf>,
    },
    /// Run a TWAP execution backtest
    #[command(name = "backtest_twap")]
    BacktestTwap {
        input: PathBuf,
        side: Side,
        qty: i32,
        slices: usize,
    },
    /// Run a VWAP execution backtest
    #[command(name = "backtest_vwap")]
    BacktestVwap {
        input: PathBuf,
        side: Side,
        qty: i32,
        slices: usize,
    },
    /// Run TWAP and VWAP on the same input and compare TCA
    #[command(name = "backtest_compare")]
    BacktestCompare {
        input: PathBuf,
        side: Side,
        qty: i32,
        slices: usize,
    },
    /// Run a batch of backtests from a requests CSV
    Batch {
        requests: PathBuf,
        runs_out: PathBuf,
        summary_out: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let exit = match cli.command {
        None => run_demo(),
        Some(Command::Replay { input, trades_out }) => run_replay(&input, trades_out.as_deref()),
        Some(Command::BacktestTwap {
            input,
            side,
            qty,
            slices,
        }) => run_backtest_mode(&input, side, qty, slices, ExecutionStrategy::Twap),
        Some(Command::BacktestVwap {
            input,
            side,
            qty,
            slices,
        }) => run_backtest_mode(&input, side, qty, slices, ExecutionStrategy::Vwap),
        Some(Command::BacktestCompare {
            input,
            side,
            qty,
            slices,
        }) => run_compare(&input, side, qty, slices),
        Some(Command::Batch {
            requests,
            runs_out,
            summary_out,
        }) => run_batch(&requests, &runs_out, &summary_out),
    };

    process::exit(exit);
}

// === Formatting helpers ===

fn fmt_level(level: &BookLevel) -> String {
    format!("{} x {}", level.price, level.quantity)
}

fn fmt_optional_level(level: Option<BookLevel>) -> String {
    level.as_ref().map_or_else(|| "--".into(), fmt_level)
}

fn fmt_optional_price(price: Option<Price>) -> String {
    price.map_or_else(|| "--".into(), |p| p.to_string())
}

fn fmt_optional_bps(value: Option<f64>) -> String {
    value.map_or_else(|| "--".into(), |v| format!("{v:.4}"))
}

fn print_book(engine: &MatchingEngine, n_levels: usize) {
    let top = engine.top_of_book();
    println!(
        "Top of book: BID {} | ASK {}",
        fmt_optional_level(top.best_bid),
        fmt_optional_level(top.best_ask)
    );
    if let Some(spread) = top.spread_ticks() {
        println!("Spread: {}", Price(spread));
    }

    let snapshot = engine.depth(n_levels);
    println!("Depth (top {n_levels} levels)");
    println!("  {:<26}ASKS", "BIDS");
    let rows = snapshot.bids.len().max(snapshot.asks.len());
    for i in 0..rows {
        let bid = snapshot.bids.get(i).map_or("--".into(), fmt_level);
        let ask = snapshot.asks.get(i).map_or("--".into(), fmt_level);
        println!("  {bid:<26}{ask}");
    }
    if rows == 0 {
        println!("  {:<26}--", "--");
    }

    println!(
        "Resting orders: bids={} asks={}",
        engine.bids().order_count(),
        engine.asks().order_count()
    );
}

fn print_submit_outcome(result: &SubmitResult) {
    println!(
        "Result: {} ({})",
        if result.accepted { "ACCEPTED" } else { "REJECTED" },
        result.reject_reason
    );
    if result.trades.is_empty() {
        println!("Trades: none");
        return;
    }

    println!("Trades ({}):", result.trades.len());
    println!("  {:<8}{:<9}{:<11}QTY", "BUY_ID", "SELL_ID", "PRICE");
    for trade in &result.trades {
        println!(
            "  {:<8}{:<9}{:<11}{}",
            trade.buy_order_id.to_string(),
            trade.sell_order_id.to_string(),
            trade.price.to_string(),
            trade.quantity
        );
    }
}

fn print_events_since(engine: &MatchingEngine, last_seen: &mut u64) {
    let events = engine.events_since(*last_seen);
    if events.is_empty() {
        println!("Events: none");
        return;
    }

    println!("Events ({}):", events.len());
    for event in events {
        print!("  #{} {}", event.seq_num, event.kind.label());
        match event.kind {
            BookEventKind::Add {
                order_id,
                side,
                price,
                quantity,
            } => print!(" oid={order_id} side={side} px={price} qty={quantity}"),
            BookEventKind::Trade {
                buy_order_id,
                sell_order_id,
                price,
                quantity,
            } => print!(" px={price} qty={quantity} buy={buy_order_id} sell={sell_order_id}"),
            BookEventKind::Cancel {
                order_id,
                side,
                price,
                quantity,
            } => print!(" oid={order_id} side={side} px={price} qty={quantity}"),
            BookEventKind::Replace {
                order_id,
                side,
                old_price,
                old_quantity,
                new_price,
                new_quantity,
            } => print!(
                " oid={order_id} side={side} old_px={old_price} old_qty={old_quantity} px={new_price} qty={new_quantity}"
            ),
        }
        println!();
    }

    *last_seen = events[events.len() - 1].seq_num;
}

fn print_separator() {
    println!("\n============================================================");
}

// === Modes ===

fn run_demo() -> i32 {
    let mut engine = MatchingEngine::new();
    let mut last_seen = 0u64;

    println!("Matching Engine Demo");

    let step = |engine: &mut MatchingEngine, last_seen: &mut u64, label: &str, result: SubmitResult| {
        print_separator();
        println!("Action: {label}");
        print_submit_outcome(&result);
        print_events_since(engine, last_seen);
        print_book(engine, 5);
    };

    let submit = |engine: &mut MatchingEngine, id: i32, side: Side, px: f64, qty: i32| {
        engine.submit(Order::limit(
            OrderId(id),
            side,
            Price::from_f64(px),
            qty,
            TimeInForce::Gtc,
        ))
    };

    let r = submit(&mut engine, 1001, Side::Buy, 101.0, 5);
    step(&mut engine, &mut last_seen, "submit BUY #1001  qty=5  px=101.0000", r);

    let r = submit(&mut engine, 1002, Side::Buy, 100.5, 4);
    step(&mut engine, &mut last_seen, "submit BUY #1002  qty=4  px=100.5000", r);

    let r = submit(&mut engine, 2001, Side::Sell, 102.0, 3);
    step(&mut engine, &mut last_seen, "submit SELL #2001 qty=3  px=102.0000", r);

    let r = submit(&mut engine, 2002, Side::Sell, 103.0, 6);
    step(&mut engine, &mut last_seen, "submit SELL #2002 qty=6  px=103.0000", r);

    let r = engine.replace(OrderId(1002), Price::from_f64(101.5), 4);
    step(&mut engine, &mut last_seen, "replace #1002 -> px=101.5000 qty=4", r);

    let r = engine.replace(OrderId(1001), Price::from_f64(103.0), 7);
    step(&mut engine, &mut last_seen, "replace #1001 -> px=103.0000 qty=7 (crossing)", r);

    let r = engine.submit(Order::market(OrderId(3001), Side::Sell, 6));
    step(&mut engine, &mut last_seen, "submit MARKET SELL #3001 qty=6", r);

    print_separator();
    println!("Action: cancel #2002");
    println!(
        "Result: {}",
        if engine.cancel(OrderId(2002)) {
            "CANCELED"
        } else {
            "NOT_FOUND"
        }
    );
    print_events_since(&engine, &mut last_seen);
    print_book(&engine, 5);

    let r = engine.submit(Order::market(OrderId(3002), Side::Buy, 1));
    step(&mut engine, &mut last_seen, "submit MARKET BUY #3002 qty=1 (no liquidity)", r);

    print_separator();
    println!("Demo complete.");
    0
}

fn run_replay(input: &std::path::Path, trades_out: Option<&std::path::Path>) -> i32 {
    let mut rows = match load_replay_csv(input) {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("Replay failed: {err}");
            return 1;
        }
    };
    sort_rows(&mut rows);

    let mut engine = MatchingEngine::new();
    let result = replay_rows(&mut engine, &rows);

    println!("Replay complete");
    println!("Rows processed: {}", result.stats.rows_processed);
    println!("Accepted actions: {}", result.stats.accepted_actions);
    println!("Rejected actions: {}", result.stats.rejected_actions);
    println!("Cancel success: {}", result.stats.cancel_success);
    println!("Cancel not found: {}", result.stats.cancel_not_found);
    println!("Trades generated: {}", result.stats.trades_generated);
    println!("Final event seq: {}", engine.last_seq_num());
    print_book(&engine, 5);

    if let Some(path) = trades_out {
        if let Err(err) = write_trades_csv(path, &result.trades) {
            eprintln!("Failed to write trades CSV: {err}");
            return 1;
        }
        println!("Wrote trades CSV: {}", path.display());
    }

    0
}

fn print_backtest_report(
    result: &BacktestResult,
    strategy: ExecutionStrategy,
    side: Side,
    qty: i32,
    slices: usize,
    include_children: bool,
) {
    println!("{strategy} backtest complete");
    println!("Config: side={side} qty={qty} slices={slices}");
    println!("Rows processed: {}", result.replay_stats.rows_processed);
    println!("Accepted replay actions: {}", result.replay_stats.accepted_actions);
    println!("Rejected replay actions: {}", result.replay_stats.rejected_actions);
    println!("Replay market trades: {}", result.replay_stats.trades_generated);
    println!("Replay market volume: {}", result.tca.market_traded_quantity);

    println!(
        "Filled quantity: {} / {} (fill_rate={:.4})",
        result.tca.filled_quantity, result.tca.target_quantity, result.tca.fill_rate
    );
    println!(
        "Average fill price: {}",
        fmt_optional_price(result.tca.average_fill_price)
    );
    match result.tca.arrival_benchmark_price {
        Some(price) => println!(
            "Arrival benchmark ({}): {price}",
            result.tca.arrival_benchmark
        ),
        None => println!("Arrival benchmark: --"),
    }
    println!(
        "Implementation shortfall (bps): {}",
        fmt_optional_bps(result.tca.implementation_shortfall_bps)
    );
    println!(
        "Participation rate: {:.4}",
        result.tca.participation_rate
    );

    if !include_children {
        return;
    }

    println!("Child orders ({}):", result.child_orders.len());
    println!(
        "  {:<6}{:<12}{:<12}{:<6}{:<6}{:<10}DETAIL",
        "#", "ORDER_ID", "SCHED_TS", "REQ", "FILL", "STATUS"
    );
    for child in &result.child_orders {
        let status = child_status(child);
        let detail = if child.skipped {
            "zero_qty".to_string()
        } else if !child.accepted {
            child.reject_reason.to_string()
        } else if let Some(price) = child.average_fill_price {
            format!("avg_px={price}")
        } else {
            "no_fill".to_string()
        };

        println!(
            "  {:<6}{:<12}{:<12}{:<6}{:<6}{:<10}{detail}",
            child.child_index,
            child.order_id.to_string(),
            child.scheduled_ts_ns,
            child.requested_quantity,
            child.filled_quantity,
            status,
        );
    }
}

fn child_status(child: &ChildExecution) -> &'static str {
    if child.skipped {
        "SKIPPED"
    } else if child.accepted {
        "ACCEPTED"
    } else {
        "REJECTED"
    }
}

fn run_backtest_mode(
    input: &std::path::Path,
    side: Side,
    qty: i32,
    slices: usize,
    strategy: ExecutionStrategy,
) -> i32 {
    let config = BacktestConfig::new(side, qty, slices, strategy);
    match run_backtest_csv(input, &config) {
        Ok(result) => {
            print_backtest_report(&result, strategy, side, qty, slices, true);
            0
        }
        Err(err) => {
            eprintln!("{strategy} backtest failed: {err}");
            1
        }
    }
}

fn run_compare(input: &std::path::Path, side: Side, qty: i32, slices: usize) -> i32 {
    let run = |strategy| {
        let config = BacktestConfig::new(side, qty, slices, strategy);
        run_backtest_csv(input, &config)
    };

    let twap = match run(ExecutionStrategy::Twap) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("TWAP backtest failed: {err}");
            return 1;
        }
    };
    let vwap = match run(ExecutionStrategy::Vwap) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("VWAP backtest failed: {err}");
            return 1;
        }
    };

    println!("Backtest compare complete");
    println!("Config: side={side} qty={qty} slices={slices}");
    println!(
        "  {:<10}{:<12}{:<12}{:<14}PARTICIPATION",
        "STRATEGY", "FILL_RATE", "AVG_PX", "SHORTFALL_BPS"
    );
    for (name, result) in [("TWAP", &twap), ("VWAP", &vwap)] {
        println!(
            "  {:<10}{:<12.4}{:<12}{:<14}{:.4}",
            name,
            result.tca.fill_rate,
            fmt_optional_price(result.tca.average_fill_price),
            fmt_optional_bps(result.tca.implementation_shortfall_bps),
            result.tca.participation_rate,
        );
    }

    if let (Some(t), Some(v)) = (
        twap.tca.implementation_shortfall_bps,
        vwap.tca.implementation_shortfall_bps,
    ) {
        println!("Shortfall delta (TWAP - VWAP bps): {:.4}", t - v);
    }

    0
}

fn run_batch(
    requests: &std::path::Path,
    runs_out: &std::path::Path,
    summary_out: &std::path::Path,
) -> i32 {
    match run_batch_csv(requests, runs_out, summary_out) {
        Ok(stats) => {
            println!("Batch complete");
            println!("Requests: {}", stats.requests);
            println!("Successful: {}", stats.successful);
            println!("Failed: {}", stats.failed);
            println!("Wrote runs CSV: {}", runs_out.display());
            println!("Wrote summary CSV: {}", summary_out.display());
            0
        }
        Err(err) => {
            eprintln!("Batch failed: {err}");
            1
        }
    }
}
