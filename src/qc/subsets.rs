use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::qc::{QcError, valid_subset_name};
use crate::sce::{ColumnData, Experiment};

#[derive(Debug, Error)]
pub enum SubsetLoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error in {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Qc(#[from] QcError),
}

/// Named group of features whose share of each cell's counts is tracked,
/// e.g. mitochondrial genes. Members are listed explicitly, matched by a
/// name prefix (case-insensitive), or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSubset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSubset {
    pub name: String,
    pub rows: Vec<usize>,
    pub missing: Vec<String>,
}

#[derive(Deserialize)]
struct SubsetFile {
    #[serde(default)]
    subset: Vec<FeatureSubset>,
}

pub fn resolve_subset(subset: &FeatureSubset, exp: &Experiment) -> Result<ResolvedSubset, QcError> {
    if !valid_subset_name(&subset.name) {
        return Err(QcError::InvalidSubsetName(subset.name.clone()));
    }

    let mut rows = BTreeSet::new();
    let mut missing = Vec::new();
    for feature in &subset.features {
        match exp.feature_index(feature) {
            Some(row) => {
                rows.insert(row);
            }
            None => missing.push(feature.clone()),
        }
    }
    if let Some(prefix) = &subset.prefix {
        let prefix = prefix.to_ascii_lowercase();
        for (row, name) in exp.feature_names().iter().enumerate() {
            if name.to_ascii_lowercase().starts_with(&prefix) {
                rows.insert(row);
            }
        }
    }

    if !missing.is_empty() {
        warn!(
            subset = subset.name.as_str(),
            missing = missing.len(),
            "subset features not found in experiment"
        );
    }

    Ok(ResolvedSubset {
        name: subset.name.clone(),
        rows: rows.into_iter().collect(),
        missing,
    })
}

pub fn resolve_subsets(
    subsets: &[FeatureSubset],
    exp: &Experiment,
) -> Result<Vec<ResolvedSubset>, QcError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(subsets.len());
    for subset in subsets {
        if !seen.insert(subset.name.as_str()) {
            return Err(QcError::DuplicateSubset(subset.name.clone()));
        }
        out.push(resolve_subset(subset, exp)?);
    }
    Ok(out)
}

/// Rows must index the experiment the subsets are applied to.
pub fn check_subset_rows(subsets: &[ResolvedSubset], n_features: usize) -> Result<(), QcError> {
    for subset in subsets {
        if let Some(row) = subset.rows.iter().find(|r| **r >= n_features) {
            return Err(QcError::SubsetRowOutOfRange {
                name: subset.name.clone(),
                row: *row,
                n_features,
            });
        }
    }
    Ok(())
}

/// Marks subset membership as logical `is_<name>` feature columns.
pub fn mark_subsets(exp: &Experiment, subsets: &[ResolvedSubset]) -> Result<Experiment, QcError> {
    check_subset_rows(subsets, exp.n_features())?;
    let mut out = exp.clone();
    for subset in subsets {
        let mut flags = vec![false; exp.n_features()];
        for row in &subset.rows {
            flags[*row] = true;
        }
        out.row_data
            .insert(&format!("is_{}", subset.name), ColumnData::Logical(flags))?;
    }
    Ok(out)
}

pub fn load_subsets_file(path: &Path) -> Result<Vec<FeatureSubset>, SubsetLoadError> {
    let text = fs::read_to_string(path)?;
    let parsed: SubsetFile = toml::from_str(&text).map_err(|source| SubsetLoadError::Toml {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    for subset in &parsed.subset {
        if !valid_subset_name(&subset.name) {
            return Err(QcError::InvalidSubsetName(subset.name.clone()).into());
        }
    }
    Ok(parsed.subset)
}

/// Loads every `*.toml` in `dir`, in file name order.
pub fn load_subsets_from_dir(dir: &Path) -> Result<Vec<FeatureSubset>, SubsetLoadError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            files.push(path);
        }
    }
    files.sort();

    let mut subsets = Vec::new();
    for file in files {
        subsets.extend(load_subsets_file(&file)?);
    }
    Ok(subsets)
}

pub fn default_subsets_dir() -> PathBuf {
    let relative = Path::new("assets").join("subsets");
    if relative.is_dir() {
        return relative;
    }

    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join("subsets");
    if manifest.is_dir() {
        return manifest;
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let sibling = dir.join("assets").join("subsets");
        if sibling.is_dir() {
            return sibling;
        }
    }

    relative
}

#[cfg(test)]
#[path = "../../tests/src_inline/qc/subsets.rs"]
mod tests;
