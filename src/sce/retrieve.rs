//! Resolution of user-supplied value specifications against an experiment.
//!
//! Plot and QC functions accept a [`ValueSpec`] wherever the caller may name
//! either a metadata column or a feature/cell whose expression should be
//! used. Lookup order for [`ValueSpec::Auto`] is metadata first, then assay
//! rows (cell info) or assay columns (feature info).

use thiserror::Error;

use crate::sce::{ColumnData, Experiment, SceError};

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("cannot find '{name}' in {searched}")]
    UnknownName { name: String, searched: &'static str },
    #[error("supplied values for '{name}' have length {found}, expected {expected}")]
    Length {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Sce(#[from] SceError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueSpec {
    /// A metadata column.
    Column(String),
    /// A feature (cell info) or a cell (feature info) read from an assay.
    Assay(String),
    /// Metadata column when present, otherwise an assay lookup.
    Auto(String),
    /// Values supplied directly by the caller.
    Values { name: String, data: ColumnData },
}

impl ValueSpec {
    pub fn name(&self) -> &str {
        match self {
            ValueSpec::Column(n) | ValueSpec::Assay(n) | ValueSpec::Auto(n) => n,
            ValueSpec::Values { name, .. } => name,
        }
    }
}

impl From<&str> for ValueSpec {
    fn from(value: &str) -> Self {
        ValueSpec::Auto(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValues {
    pub name: String,
    pub values: ColumnData,
}

/// Resolves a per-cell value vector.
pub fn retrieve_cell_info(
    exp: &Experiment,
    spec: &ValueSpec,
    exprs_values: &str,
) -> Result<ResolvedValues, RetrieveError> {
    match spec {
        ValueSpec::Column(name) => from_column(&exp.col_data, name, "cell metadata"),
        ValueSpec::Assay(name) => feature_row(exp, name, exprs_values),
        ValueSpec::Auto(name) => {
            if exp.col_data.contains(name) {
                from_column(&exp.col_data, name, "cell metadata")
            } else if exp.feature_index(name).is_some() {
                feature_row(exp, name, exprs_values)
            } else {
                Err(RetrieveError::UnknownName {
                    name: name.clone(),
                    searched: "cell metadata or feature names",
                })
            }
        }
        ValueSpec::Values { name, data } => supplied(name, data, exp.n_cells()),
    }
}

/// Resolves a per-feature value vector.
pub fn retrieve_feature_info(
    exp: &Experiment,
    spec: &ValueSpec,
    exprs_values: &str,
) -> Result<ResolvedValues, RetrieveError> {
    match spec {
        ValueSpec::Column(name) => from_column(&exp.row_data, name, "feature metadata"),
        ValueSpec::Assay(name) => cell_column(exp, name, exprs_values),
        ValueSpec::Auto(name) => {
            if exp.row_data.contains(name) {
                from_column(&exp.row_data, name, "feature metadata")
            } else if exp.cell_index(name).is_some() {
                cell_column(exp, name, exprs_values)
            } else {
                Err(RetrieveError::UnknownName {
                    name: name.clone(),
                    searched: "feature metadata or cell names",
                })
            }
        }
        ValueSpec::Values { name, data } => supplied(name, data, exp.n_features()),
    }
}

fn from_column(
    annotations: &crate::sce::Annotations,
    name: &str,
    searched: &'static str,
) -> Result<ResolvedValues, RetrieveError> {
    let data = annotations
        .get(name)
        .ok_or_else(|| RetrieveError::UnknownName {
            name: name.to_string(),
            searched,
        })?;
    Ok(ResolvedValues {
        name: name.to_string(),
        values: data.clone(),
    })
}

fn feature_row(
    exp: &Experiment,
    name: &str,
    exprs_values: &str,
) -> Result<ResolvedValues, RetrieveError> {
    let row = exp
        .feature_index(name)
        .ok_or_else(|| RetrieveError::UnknownName {
            name: name.to_string(),
            searched: "feature names",
        })?;
    let assay = exp.assay(exprs_values)?;
    let values = assay.dense_rows(&[row]).pop().unwrap_or_default();
    Ok(ResolvedValues {
        name: name.to_string(),
        values: ColumnData::Numeric(values),
    })
}

fn cell_column(
    exp: &Experiment,
    name: &str,
    exprs_values: &str,
) -> Result<ResolvedValues, RetrieveError> {
    let col = exp
        .cell_index(name)
        .ok_or_else(|| RetrieveError::UnknownName {
            name: name.to_string(),
            searched: "cell names",
        })?;
    let assay = exp.assay(exprs_values)?;
    Ok(ResolvedValues {
        name: name.to_string(),
        values: ColumnData::Numeric(assay.dense_col(col)),
    })
}

fn supplied(name: &str, data: &ColumnData, expected: usize) -> Result<ResolvedValues, RetrieveError> {
    if data.len() != expected {
        return Err(RetrieveError::Length {
            name: name.to_string(),
            expected,
            found: data.len(),
        });
    }
    Ok(ResolvedValues {
        name: name.to_string(),
        values: data.clone(),
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/sce/retrieve.rs"]
mod tests;
