//! Batch runner: execute many backtests from a requests CSV and summarize.
//!
//! Each request names a dataset (an action CSV) plus the backtest knobs.
//! Runs are written one per row; the summary aggregates `{count, mean, p50,
//! p95}` per strategy and metric, plus paired TWAP-minus-VWAP deltas across
//! scenarios that share `(dataset, side, qty, slices)`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};

use crate::backtest::{run_backtest_csv, BacktestConfig, BacktestResult, ExecutionStrategy};
use crate::csv_io::{check_header, is_blank_line};
use crate::error::{Error, Result};
use crate::{Price, Side};

/// Exact, case-sensitive header of a batch requests CSV.
pub const BATCH_CSV_HEADER: [&str; 5] = ["dataset", "side", "qty", "slices", "strategy"];

/// One parsed batch request.
#[derive(Clone, Debug)]
pub struct BatchRequest {
    pub dataset: String,
    pub side: Side,
    pub quantity: i32,
    pub slices: i32,
    pub strategy: ExecutionStrategy,
}

/// One executed request: either a full backtest result or the error text.
#[derive(Debug)]
pub struct BatchRun {
    /// 1-based position in the requests file
    pub run_id: usize,
    pub request: BatchRequest,
    pub outcome: std::result::Result<BacktestResult, String>,
}

/// Batch-level counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub requests: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Distribution of one metric across runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
}

/// One row of the summary CSV.
#[derive(Clone, Debug)]
pub struct SummaryRow {
    pub section: &'static str,
    pub key: &'static str,
    pub metric: &'static str,
    pub stats: DistributionStats,
}

/// Run every request, then write the runs CSV and the summary CSV.
pub fn run_batch_csv(
    requests_path: &Path,
    runs_output_path: &Path,
    summary_output_path: &Path,
) -> Result<BatchStats> {
    let requests = parse_requests_csv(requests_path)?;
    let mut stats = BatchStats {
        requests: requests.len(),
        ..BatchStats::default()
    };

    let mut runs = Vec::with_capacity(requests.len());
    for (i, request) in requests.into_iter().enumerate() {
        let config = BacktestConfig::new(
            request.side,
            request.quantity,
            request.slices as usize,
            request.strategy,
        );

        log::info!(
            "batch run {}/{}: {} {} qty={} slices={} on {}",
            i + 1,
            stats.requests,
            request.strategy,
            request.side,
            request.quantity,
            request.slices,
            request.dataset
        );

        let outcome = run_backtest_csv(Path::new(&request.dataset), &config)
            .map_err(|err| err.to_string());
        match &outcome {
            Ok(_) => stats.successful += 1,
            Err(err) => {
                log::warn!("batch run {} failed: {err}", i + 1);
                stats.failed += 1;
            }
        }

        runs.push(BatchRun {
            run_id: i + 1,
            request,
            outcome,
        });
    }

    write_runs_csv(runs_output_path, &runs)?;
    write_summary_csv(summary_output_path, &runs)?;
    Ok(stats)
}

// === Requests CSV ===

fn parse_requests_csv(path: &Path) -> Result<Vec<BatchRequest>> {
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
    check_header(&header, &BATCH_CSV_HEADER)?;

    let mut requests = Vec::new();
    for record in records {
        let record = record.map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if is_blank_line(&record) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        requests.push(parse_request(&record, line)?);
    }

    if requests.is_empty() {
        return Err(Error::CsvEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(requests)
}

fn parse_request(record: &StringRecord, line: u64) -> Result<BatchRequest> {
    let parse_err = |message: String| Error::CsvParse { line, message };

    if record.len() != BATCH_CSV_HEADER.len() {
        return Err(parse_err(format!(
            "expected {} columns, found {}",
            BATCH_CSV_HEADER.len(),
            record.len()
        )));
    }

    let dataset = record[0].to_string();
    if dataset.is_empty() {
        return Err(parse_err("dataset cannot be empty".into()));
    }

    let side: Side = record[1].parse().map_err(parse_err)?;

    let quantity: i32 = record[2]
        .parse()
        .ok()
        .filter(|qty| *qty > 0)
        .ok_or_else(|| parse_err("invalid qty (expected positive integer)".into()))?;

    let slices: i32 = record[3]
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| parse_err("invalid slices (expected positive integer)".into()))?;

    let strategy: ExecutionStrategy = record[4].parse().map_err(parse_err)?;

    Ok(BatchRequest {
        dataset,
        side,
        quantity,
        slices,
        strategy,
    })
}

// === Output CSVs ===

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

fn fmt_double(value: f64) -> String {
    format!("{value:.6}")
}

fn fmt_price(price: Price) -> String {
    format!("{:.4}", price.to_f64())
}

fn write_runs_csv(path: &Path, runs: &[BatchRun]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|source| Error::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let as_csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    writer
        .write_record([
            "run_id",
            "dataset",
            "side",
            "qty",
            "slices",
            "strategy",
            "status",
            "error",
            "filled_qty",
            "target_qty",
            "fill_rate",
            "avg_fill_price",
            "arrival_benchmark_name",
            "arrival_benchmark_price",
            "shortfall_bps",
            "participation_rate",
            "replay_rows",
            "replay_trades",
        ])
        .map_err(as_csv_error)?;

    for run in runs {
        let mut record = vec![
            run.run_id.to_string(),
            run.request.dataset.clone(),
            run.request.side.to_string(),
            run.request.quantity.to_string(),
            run.request.slices.to_string(),
            run.request.strategy.to_string(),
        ];

        match &run.outcome {
            Err(error) => {
                record.push("FAILED".into());
                record.push(error.clone());
                // Empty tokens for every TCA field
                record.extend(std::iter::repeat(String::new()).take(10));
            }
            Ok(result) => {
                let tca = &result.tca;
                record.push("SUCCESS".into());
                record.push(String::new());
                record.push(tca.filled_quantity.to_string());
                record.push(tca.target_quantity.to_string());
                record.push(fmt_double(tca.fill_rate));
                record.push(tca.average_fill_price.map(fmt_price).unwrap_or_default());
                record.push(tca.arrival_benchmark.to_string());
                record.push(
                    tca.arrival_benchmark_price
                        .map(fmt_price)
                        .unwrap_or_default(),
                );
                record.push(
                    tca.implementation_shortfall_bps
                        .map(fmt_double)
                        .unwrap_or_default(),
                );
                record.push(fmt_double(tca.participation_rate));
                record.push(result.replay_stats.rows_processed.to_string());
                record.push(result.replay_stats.trades_generated.to_string());
            }
        }

        writer.write_record(&record).map_err(as_csv_error)?;
    }

    writer.flush().map_err(|source| Error::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn write_summary_csv(path: &Path, runs: &[BatchRun]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|source| Error::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let as_csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    writer
        .write_record(["section", "key", "metric", "count", "mean", "p50", "p95"])
        .map_err(as_csv_error)?;

    for row in build_summary_rows(runs) {
        writer
            .write_record([
                row.section.to_string(),
                row.key.to_string(),
                row.metric.to_string(),
                row.stats.count.to_string(),
                fmt_double(row.stats.mean),
                fmt_double(row.stats.p50),
                fmt_double(row.stats.p95),
            ])
            .map_err(as_csv_error)?;
    }

    writer.flush().map_err(|source| Error::CsvWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// === Statistics ===

/// Linear-interpolation percentile over pre-sorted samples.
fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted {
        [] => None,
        [only] => Some(*only),
        _ => {
            let index = p * (sorted.len() - 1) as f64;
            let lower = index.floor() as usize;
            let upper = index.ceil() as usize;
            let weight = index - lower as f64;
            Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
        }
    }
}

fn distribution(mut values: Vec<f64>) -> Option<DistributionStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).expect("metric values are finite"));

    let sum: f64 = values.iter().sum();
    Some(DistributionStats {
        count: values.len(),
        mean: sum / values.len() as f64,
        p50: percentile(&values, 0.50)?,
        p95: percentile(&values, 0.95)?,
    })
}

#[derive(Default)]
struct MetricValues {
    fill_rate: Vec<f64>,
    shortfall: Vec<f64>,
    participation: Vec<f64>,
}

/// TWAP-minus-VWAP, positionally paired within one scenario.
fn paired_delta(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    lhs.iter().zip(rhs).map(|(l, r)| l - r).collect()
}

/// Build the summary: per-strategy distributions, then paired deltas across
/// scenarios keyed by `(dataset, side, qty, slices)`.
pub fn build_summary_rows(runs: &[BatchRun]) -> Vec<SummaryRow> {
    let mut twap = MetricValues::default();
    let mut vwap = MetricValues::default();

    #[derive(Default)]
    struct ScenarioValues {
        twap: MetricValues,
        vwap: MetricValues,
    }
    let mut by_scenario: BTreeMap<(String, String, i32, i32), ScenarioValues> = BTreeMap::new();

    for run in runs {
        let Ok(result) = &run.outcome else {
            continue;
        };

        let scenario = by_scenario
            .entry((
                run.request.dataset.clone(),
                run.request.side.to_string(),
                run.request.quantity,
                run.request.slices,
            ))
            .or_default();
        let (strategy_values, scenario_values) = match run.request.strategy {
            ExecutionStrategy::Twap => (&mut twap, &mut scenario.twap),
            ExecutionStrategy::Vwap => (&mut vwap, &mut scenario.vwap),
        };

        strategy_values.fill_rate.push(result.tca.fill_rate);
        strategy_values
            .participation
            .push(result.tca.participation_rate);
        scenario_values.fill_rate.push(result.tca.fill_rate);
        scenario_values
            .participation
            .push(result.tca.participation_rate);

        if let Some(shortfall) = result.tca.implementation_shortfall_bps {
            strategy_values.shortfall.push(shortfall);
            scenario_values.shortfall.push(shortfall);
        }
    }

    let mut rows = Vec::new();
    let mut push_strategy = |key: &'static str, values: &MetricValues| {
        let metrics: [(&'static str, &Vec<f64>); 3] = [
            ("fill_rate", &values.fill_rate),
            ("shortfall_bps", &values.shortfall),
            ("participation_rate", &values.participation),
        ];
        for (metric, samples) in metrics {
            if let Some(stats) = distribution(samples.clone()) {
                rows.push(SummaryRow {
                    section: "strategy",
                    key,
                    metric,
                    stats,
                });
            }
        }
    };
    push_strategy("TWAP", &twap);
    push_strategy("VWAP", &vwap);

    let mut delta = MetricValues::default();
    for scenario in by_scenario.values() {
        delta
            .fill_rate
            .extend(paired_delta(&scenario.twap.fill_rate, &scenario.vwap.fill_rate));
        delta
            .shortfall
            .extend(paired_delta(&scenario.twap.shortfall, &scenario.vwap.shortfall));
        delta.participation.extend(paired_delta(
            &scenario.twap.participation,
            &scenario.vwap.participation,
        ));
    }

    let delta_metrics: [(&'static str, Vec<f64>); 3] = [
        ("fill_rate_delta", delta.fill_rate),
        ("shortfall_bps_delta", delta.shortfall),
        ("participation_rate_delta", delta.participation),
    ];
    for (metric, samples) in delta_metrics {
        if let Some(stats) = distribution(samples) {
            rows.push(SummaryRow {
                section: "delta",
                key: "TWAP_MINUS_VWAP",
                metric,
                stats,
            });
        }
    }

    rows
}
