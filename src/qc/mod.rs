pub mod cell;
pub mod feature;
pub mod outliers;
pub mod subsets;

use thiserror::Error;

use crate::sce::SceError;

#[derive(Debug, Error)]
pub enum QcError {
    #[error(transparent)]
    Sce(#[from] SceError),
    #[error("invalid subset name '{0}': use letters, digits and underscores")]
    InvalidSubsetName(String),
    #[error("duplicate subset name '{0}'")]
    DuplicateSubset(String),
    #[error("unknown subset '{0}' in QC table")]
    UnknownSubset(String),
    #[error("cell subset '{name}' has {found} entries, expected {expected}")]
    CellSubsetLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("batch labels have {found} entries, expected {expected}")]
    BatchLength { expected: usize, found: usize },
    #[error("subset '{name}' refers to row {row} but the experiment has {n_features} features")]
    SubsetRowOutOfRange {
        name: String,
        row: usize,
        n_features: usize,
    },
    #[error("percent_top values must be positive")]
    InvalidPercentTop,
}

pub(crate) fn valid_subset_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
