//! CSV adapters: the recorded-action reader and the trade writer.
//!
//! The action format is strict: an exact 12-column header, typed fields, no
//! extra columns. Any deviation aborts the load with a `line N: ...`
//! diagnostic and no partial result.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use crate::error::{Error, Result};
use crate::replay::{ReplayAction, ReplayRow, TradeRecord};
use crate::{Order, OrderId, OrderType, Price, Quantity, Side, TimeInForce};

/// Exact, case-sensitive header of an action CSV.
pub const ACTION_CSV_HEADER: [&str; 12] = [
    "ts_ns",
    "seq",
    "action",
    "order_id",
    "side",
    "type",
    "price",
    "qty",
    "tif",
    "new_price",
    "new_qty",
    "notes",
];

/// Header written ahead of trade records.
pub const TRADE_CSV_HEADER: [&str; 7] = [
    "ts_ns",
    "seq",
    "buy_order_id",
    "sell_order_id",
    "price_ticks",
    "price",
    "quantity",
];

/// Load replay rows from an action CSV.
///
/// Rows come back in file order with `arrival_index` assigned; callers sort
/// with [`crate::replay::sort_rows`] before driving an engine.
pub fn load_replay_csv(path: &Path) -> Result<Vec<ReplayRow>> {
    let file = File::open(path).map_err(|source| Error::CsvOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            return Err(Error::CsvParse {
                line: 1,
                message: "CSV file is empty".into(),
            })
        }
    };
    check_header(&header, &ACTION_CSV_HEADER)?;

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if is_blank_line(&record) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        let arrival_index = rows.len();
        rows.push(parse_row(&record, line, arrival_index)?);
    }

    Ok(rows)
}

/// Write row-stamped trades with both tick and display prices.
pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = WriterBuilder::new().from_writer(file);

    let as_csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    writer.write_record(TRADE_CSV_HEADER).map_err(as_csv_error)?;
    for trade in trades {
        writer
            .write_record([
                trade.ts_ns.to_string(),
                trade.seq.to_string(),
                trade.buy_order_id.to_string(),
                trade.sell_order_id.to_string(),
                trade.price.0.to_string(),
                format!("{:.4}", trade.price.to_f64()),
                trade.quantity.to_string(),
            ])
            .map_err(as_csv_error)?;
    }

    writer.flush().map_err(|source| Error::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// A whitespace-only line tokenizes as a single empty field; treat it as a
/// blank line and skip it. A line of delimiters (",,,") is not blank and
/// still fails the per-row parse. Shared with the batch-request reader.
pub(crate) fn is_blank_line(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].trim().is_empty()
}

/// Validate an exact header row. Shared with the batch-request reader.
pub(crate) fn check_header(record: &StringRecord, expected: &[&str]) -> Result<()> {
    if record.len() != expected.len() {
        return Err(Error::CsvParse {
            line: 1,
            message: format!("invalid header: expected {} columns", expected.len()),
        });
    }
    for (i, want) in expected.iter().enumerate() {
        let found = &record[i];
        if found != *want {
            return Err(Error::CsvParse {
                line: 1,
                message: format!(
                    "invalid header column {}: expected '{}' but found '{}'",
                    i + 1,
                    want,
                    found
                ),
            });
        }
    }
    Ok(())
}

fn parse_err(line: u64, message: impl Into<String>) -> Error {
    Error::CsvParse {
        line,
        message: message.into(),
    }
}

fn parse_u64(field: &str, line: u64, what: &str) -> Result<u64> {
    field
        .parse::<u64>()
        .map_err(|_| parse_err(line, format!("invalid {what}")))
}

fn parse_price(field: &str, line: u64, what: &str) -> Result<Price> {
    let value: f64 = field
        .parse()
        .map_err(|_| parse_err(line, format!("invalid {what}")))?;
    if !value.is_finite() {
        return Err(parse_err(line, format!("invalid {what}")));
    }
    Ok(Price::from_f64(value))
}

fn parse_row(record: &StringRecord, line: u64, arrival_index: usize) -> Result<ReplayRow> {
    if record.len() != ACTION_CSV_HEADER.len() {
        return Err(parse_err(
            line,
            format!(
                "expected {} columns, found {}",
                ACTION_CSV_HEADER.len(),
                record.len()
            ),
        ));
    }

    let ts_ns = parse_u64(&record[0], line, "ts_ns")?;
    let seq = parse_u64(&record[1], line, "seq")?;

    // Fields validate in column order: action before order_id.
    enum ActionKind {
        New,
        Cancel,
        Replace,
    }
    let kind = match &record[2] {
        "NEW" => ActionKind::New,
        "CANCEL" => ActionKind::Cancel,
        "REPLACE" => ActionKind::Replace,
        _ => {
            return Err(parse_err(
                line,
                "invalid action (expected NEW/CANCEL/REPLACE)",
            ))
        }
    };

    let order_id: i32 = record[3]
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| parse_err(line, "invalid order_id (expected positive integer)"))?;
    let order_id = OrderId(order_id);

    let action = match kind {
        ActionKind::New => {
            let side: Side = record[4].parse().map_err(|e: String| parse_err(line, e))?;
            let order_type: OrderType =
                record[5].parse().map_err(|e: String| parse_err(line, e))?;

            let price = match order_type {
                OrderType::Limit => {
                    let price = parse_price(&record[6], line, "price for LIMIT order")?;
                    if !price.is_valid_limit() {
                        return Err(parse_err(line, "invalid price for LIMIT order"));
                    }
                    price
                }
                OrderType::Market => Price::ZERO,
            };

            let quantity: Quantity = record[7]
                .parse()
                .ok()
                .filter(|qty| *qty > 0)
                .ok_or_else(|| parse_err(line, "invalid qty (expected positive integer)"))?;

            let tif: TimeInForce = record[8].parse().map_err(|e: String| parse_err(line, e))?;

            ReplayAction::New(Order {
                id: order_id,
                side,
                price,
                quantity,
                tif,
                order_type,
            })
        }
        ActionKind::Cancel => ReplayAction::Cancel { order_id },
        ActionKind::Replace => {
            let new_price = parse_price(&record[9], line, "new_price for REPLACE")?;
            if !new_price.is_valid_limit() {
                return Err(parse_err(line, "invalid new_price for REPLACE"));
            }
            let new_quantity: Quantity = record[10]
                .parse()
                .ok()
                .filter(|qty| *qty > 0)
                .ok_or_else(|| parse_err(line, "invalid new_qty for REPLACE"))?;

            ReplayAction::Replace {
                order_id,
                new_price,
                new_quantity,
            }
        }
    };

    Ok(ReplayRow {
        ts_ns,
        seq,
        arrival_index,
        action,
    })
}
