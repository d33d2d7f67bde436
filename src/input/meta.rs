use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::warn;

use crate::input::{InputError, open_reader};
use crate::sce::ColumnData;

pub const CELL_ID_COLUMN: &str = "cell_id";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetaStats {
    /// Metadata rows whose cell_id is a known barcode.
    pub matched: usize,
    /// Metadata rows for unknown barcodes.
    pub missing: usize,
    pub duplicate_rows: usize,
    /// Barcodes with no metadata row.
    pub unannotated: usize,
}

/// Per-cell metadata aligned to the barcode order.
#[derive(Debug, Clone, PartialEq)]
pub struct CellMetadata {
    pub columns: Vec<(String, ColumnData)>,
    pub stats: MetaStats,
}

/// Reads a tab-separated table with a `cell_id` column. Every other column
/// becomes one per-cell column; cells without a row get empty values.
pub fn read_cell_metadata(path: &Path, barcodes: &[String]) -> Result<CellMetadata, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(open_reader(path)?);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(InputError::InvalidTsvRow {
            line: 1,
            reason: "empty meta file".to_string(),
        });
    }
    let cell_idx = headers
        .iter()
        .position(|h| h == CELL_ID_COLUMN)
        .ok_or_else(|| InputError::MissingMetaColumn(CELL_ID_COLUMN.to_string()))?;
    let value_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != cell_idx)
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut index_by_cell: HashMap<&str, usize> = HashMap::with_capacity(barcodes.len());
    for (i, b) in barcodes.iter().enumerate() {
        index_by_cell.entry(b.as_str()).or_insert(i);
    }

    let mut raw: Vec<Vec<String>> = vec![vec![String::new(); barcodes.len()]; value_columns.len()];
    let mut annotated = vec![false; barcodes.len()];
    let mut seen: HashSet<String> = HashSet::new();
    let mut stats = MetaStats::default();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let cell_id = record.get(cell_idx).unwrap_or("").trim();
        if cell_id.is_empty() {
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            return Err(InputError::MissingMetaCellId(line));
        }
        if !seen.insert(cell_id.to_string()) {
            stats.duplicate_rows += 1;
            continue;
        }
        let Some(&cell) = index_by_cell.get(cell_id) else {
            stats.missing += 1;
            continue;
        };
        stats.matched += 1;
        annotated[cell] = true;
        for (slot, (col, _)) in raw.iter_mut().zip(value_columns.iter()) {
            slot[cell] = record.get(*col).unwrap_or("").to_string();
        }
    }

    stats.unannotated = annotated.iter().filter(|a| !**a).count();
    if stats.duplicate_rows > 0 {
        warn!(
            duplicates = stats.duplicate_rows,
            "duplicate cell_id rows in metadata; keeping first"
        );
    }
    if stats.missing > 0 {
        warn!(
            rows = stats.missing,
            "metadata rows refer to unknown barcodes"
        );
    }

    let columns = value_columns
        .into_iter()
        .zip(raw)
        .map(|((_, name), values)| (name, ColumnData::infer(values)))
        .collect();

    Ok(CellMetadata { columns, stats })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/meta.rs"]
mod tests;
