use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use crate::input::InputError;
use crate::input::features::tsv_reader;

/// One barcode per line; only the first column is used.
pub fn read_barcodes(path: &Path) -> Result<Vec<String>, InputError> {
    let mut reader = tsv_reader(path)?;
    let mut barcodes = Vec::new();
    for record in reader.records() {
        let record = record?;
        barcodes.push(record.get(0).unwrap_or("").trim().to_string());
    }
    check_barcodes(&barcodes)?;
    Ok(barcodes)
}

/// Rejects empty lists and blank barcodes; repeated barcodes only warn
/// since cell lookups resolve to the first occurrence.
pub fn check_barcodes(barcodes: &[String]) -> Result<(), InputError> {
    if barcodes.is_empty() {
        return Err(InputError::InvalidTsvRow {
            line: 0,
            reason: "no barcodes found".to_string(),
        });
    }
    if let Some(pos) = barcodes.iter().position(|b| b.trim().is_empty()) {
        return Err(InputError::EmptyBarcode(pos + 1));
    }
    let mut seen = HashSet::with_capacity(barcodes.len());
    let repeated = barcodes.iter().filter(|b| !seen.insert(b.as_str())).count();
    if repeated > 0 {
        warn!(repeated, "duplicate barcodes found");
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/barcodes.rs"]
mod tests;
