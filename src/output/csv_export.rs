//! CSV export of item results

use crate::output::OutputError;
use crate::state::ItemResult;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Fixed leading columns of the results file
pub const RESULT_COLUMNS: [&str; 5] = ["idx", "query", "ok", "http_status", "note"];

/// Prefix for columns holding classified page data
const DATA_COLUMN_PREFIX: &str = "data_";

/// Suffix appended to the item file's stem
const OUTPUT_SUFFIX: &str = "_analyzed";

/// Returns `<stem>_analyzed.csv` next to the item file, or in `output_dir`
pub fn default_output_path(items_path: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = items_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "items".to_string());
    let file_name = format!("{}{}.csv", stem, OUTPUT_SUFFIX);

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => items_path.with_file_name(file_name),
    }
}

/// Returns `path`, or the first free `name (N).ext` variant of it
pub fn dedupe_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{} ({}){}", stem, n, extension));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Writes `results` to a deduplicated variant of `target`
///
/// Columns are the fixed result columns followed by one `data_<key>` column
/// per key seen in any result, sorted by key. Returns the path written.
pub fn write_results_csv(results: &[ItemResult], target: &Path) -> Result<PathBuf, OutputError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let path = dedupe_path(target);

    let keys: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.data.keys().map(String::as_str))
        .collect();

    let mut writer = csv::WriterBuilder::new().from_path(&path)?;

    let mut header: Vec<String> = RESULT_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(keys.iter().map(|k| format!("{}{}", DATA_COLUMN_PREFIX, k)));
    writer.write_record(&header)?;

    for result in results {
        let mut record = vec![
            result.idx.to_string(),
            result.query.clone(),
            result.ok.to_string(),
            result.http_status.map(|s| s.to_string()).unwrap_or_default(),
            result.note.clone(),
        ];
        record.extend(keys.iter().map(|k| cell_text(result.data.get(*k))));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::info!("Wrote {} result(s) to {}", results.len(), path.display());
    Ok(path)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
