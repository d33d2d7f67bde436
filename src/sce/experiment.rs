use std::collections::{BTreeMap, HashMap};

use crate::expr::csc::CscMatrix;
use crate::sce::{Annotations, Assay, SceError};

/// Expression container: assays over features x cells plus row and column
/// metadata.
#[derive(Debug, Clone)]
pub struct Experiment {
    feature_ids: Vec<String>,
    feature_names: Vec<String>,
    cell_names: Vec<String>,
    pub assays: BTreeMap<String, Assay>,
    pub row_data: Annotations,
    pub col_data: Annotations,
    pub size_factors: Option<Vec<f64>>,
    first_index_by_name: HashMap<String, usize>,
}

impl Experiment {
    /// Creates an experiment holding `counts` as its only assay.
    pub fn from_counts(
        counts: CscMatrix<u32>,
        feature_ids: Vec<String>,
        feature_names: Vec<String>,
        cell_names: Vec<String>,
    ) -> Result<Self, SceError> {
        if feature_names.len() != counts.n_rows || feature_ids.len() != counts.n_rows {
            return Err(SceError::Dimension {
                what: "features",
                expected: counts.n_rows,
                found: feature_names.len().min(feature_ids.len()),
            });
        }
        if cell_names.len() != counts.n_cols {
            return Err(SceError::Dimension {
                what: "cells",
                expected: counts.n_cols,
                found: cell_names.len(),
            });
        }

        let first_index_by_name = index_names(&feature_names);
        let n_features = counts.n_rows;
        let n_cells = counts.n_cols;
        let mut assays = BTreeMap::new();
        assays.insert("counts".to_string(), Assay::Counts(counts));

        Ok(Self {
            feature_ids,
            feature_names,
            cell_names,
            assays,
            row_data: Annotations::new(n_features),
            col_data: Annotations::new(n_cells),
            size_factors: None,
            first_index_by_name,
        })
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn cell_names(&self) -> &[String] {
        &self.cell_names
    }

    /// Replaces the row names and rebuilds the name lookup.
    pub fn set_feature_names(&mut self, names: Vec<String>) -> Result<(), SceError> {
        if names.len() != self.n_features() {
            return Err(SceError::Dimension {
                what: "features",
                expected: self.n_features(),
                found: names.len(),
            });
        }
        self.first_index_by_name = index_names(&names);
        self.feature_names = names;
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cell_names.len()
    }

    pub fn assay(&self, name: &str) -> Result<&Assay, SceError> {
        self.assays.get(name).ok_or_else(|| SceError::UnknownAssay {
            name: name.to_string(),
            available: self.assays.keys().cloned().collect(),
        })
    }

    pub fn add_assay(&mut self, name: &str, assay: Assay) -> Result<(), SceError> {
        if assay.n_rows() != self.n_features() {
            return Err(SceError::Dimension {
                what: "assay rows",
                expected: self.n_features(),
                found: assay.n_rows(),
            });
        }
        if assay.n_cols() != self.n_cells() {
            return Err(SceError::Dimension {
                what: "assay columns",
                expected: self.n_cells(),
                found: assay.n_cols(),
            });
        }
        self.assays.insert(name.to_string(), assay);
        Ok(())
    }

    /// Row of a feature name; the first occurrence wins for duplicates.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.first_index_by_name.get(name).copied()
    }

    pub fn cell_index(&self, name: &str) -> Option<usize> {
        self.cell_names.iter().position(|c| c == name)
    }
}

fn index_names(names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        index.entry(name.clone()).or_insert(idx);
    }
    index
}
