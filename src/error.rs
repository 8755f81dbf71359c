//! Error types for the I/O-facing surface.
//!
//! Engine-level rejections are not errors; they come back as structured
//! [`SubmitResult`](crate::SubmitResult) values. This type covers CSV
//! loading/writing, backtest configuration, and the batch runner.

use std::path::PathBuf;

/// All errors the crate's file-facing operations can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open CSV file {}: {source}", .path.display())]
    CsvOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write CSV file {}: {source}", .path.display())]
    CsvWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed record or field; displays as `line N: <message>`.
    #[error("line {line}: {message}")]
    CsvParse { line: u64, message: String },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("CSV file {} has no data rows", .path.display())]
    CsvEmpty { path: PathBuf },

    #[error("replay stream has no rows")]
    EmptyReplay,

    #[error("invalid backtest config: {0}")]
    Config(String),

    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
