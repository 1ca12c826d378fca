//! Output module for exporting run results
//!
//! This module handles:
//! - Writing the merged checkpoint contents to a CSV file
//! - Choosing a non-clobbering output filename
//! - Summarising checkpoint statistics for `--stats`

mod csv_export;
pub mod stats;

pub use csv_export::{default_output_path, dedupe_path, write_results_csv, RESULT_COLUMNS};
pub use stats::{load_statistics, print_statistics, RunStatistics};

use thiserror::Error;

/// Errors raised while writing output files
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
