use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::input::{InputError, open_reader};

/// A feature name seen more than once; rows are 1-based as in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName {
    pub name: String,
    pub first_row: usize,
    pub dup_row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub duplicates: Vec<DuplicateName>,
}

impl FeatureTable {
    pub fn new(ids: Vec<String>, names: Vec<String>) -> Self {
        let duplicates = find_duplicates(&names);
        Self {
            ids,
            names,
            duplicates,
        }
    }

    /// Caches only carry one label per feature; it doubles as the id.
    pub fn from_names(names: Vec<String>) -> Self {
        Self::new(names.clone(), names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn find_duplicates(names: &[String]) -> Vec<DuplicateName> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for (idx, name) in names.iter().enumerate() {
        match first_seen.get(name.as_str()) {
            Some(first) => duplicates.push(DuplicateName {
                name: name.clone(),
                first_row: *first,
                dup_row: idx + 1,
            }),
            None => {
                first_seen.insert(name, idx + 1);
            }
        }
    }
    duplicates
}

/// Reads `features.tsv` / `genes.tsv`: feature id in the first column,
/// symbol in the second. A missing or blank symbol falls back to the id.
pub fn read_features(path: &Path) -> Result<FeatureTable, InputError> {
    let mut reader = tsv_reader(path)?;
    let mut ids = Vec::new();
    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let id = record.get(0).unwrap_or("").trim();
        if id.is_empty() {
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            return Err(InputError::InvalidTsvRow {
                line,
                reason: "missing feature id".to_string(),
            });
        }
        let name = record
            .get(1)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(id);
        ids.push(id.to_string());
        names.push(name.to_string());
    }

    if names.is_empty() {
        return Err(InputError::InvalidTsvRow {
            line: 0,
            reason: "no feature rows found".to_string(),
        });
    }
    Ok(FeatureTable::new(ids, names))
}

/// Headerless, unquoted, tab-separated reader over a plain or gzipped file.
pub(crate) fn tsv_reader(path: &Path) -> Result<csv::Reader<Box<dyn BufRead>>, InputError> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(open_reader(path)?))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/features.rs"]
mod tests;
