//! Item loading from CSV
//!
//! The first row is a header and is ignored by name; columns are read by
//! position: brand, model, and an optional buy price. An item's idx is its
//! data row index (0 = first row after the header), so idx values stay
//! stable when blank rows are dropped.

use crate::state::Item;
use crate::PacerError;
use std::path::Path;

const BRAND_COLUMN: usize = 0;
const MODEL_COLUMN: usize = 1;
const BUY_PRICE_COLUMN: usize = 2;

/// Loads items from a CSV file
///
/// Rows with neither brand nor model are skipped.
pub fn load_items(path: &Path) -> Result<Vec<Item>, PacerError> {
    if !path.exists() {
        return Err(PacerError::Input {
            path: path.display().to_string(),
            message: "file does not exist".to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut items = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let brand = record.get(BRAND_COLUMN).unwrap_or_default();
        let model = record.get(MODEL_COLUMN).unwrap_or_default();
        if brand.is_empty() && model.is_empty() {
            tracing::debug!("Skipping empty row {}", row);
            continue;
        }

        let buy_price = record.get(BUY_PRICE_COLUMN).and_then(parse_price);
        items.push(Item::new(row as i64, brand, model).with_buy_price(buy_price));
    }

    tracing::info!("Loaded {} item(s) from {}", items.len(), path.display());
    Ok(items)
}

/// Parses a price such as `"12 990,50"`
///
/// Spaces (including non-breaking ones) are dropped and a decimal comma is
/// accepted.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}
