pub mod annotations;
pub mod assay;
pub mod experiment;
pub mod retrieve;

use thiserror::Error;

pub use annotations::{Annotations, ColumnData};
pub use assay::Assay;
pub use experiment::Experiment;

#[derive(Debug, Error)]
pub enum SceError {
    #[error("unknown assay '{name}' (available: {})", .available.join(", "))]
    UnknownAssay {
        name: String,
        available: Vec<String>,
    },
    #[error("column '{name}' has {found} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{what} dimension mismatch: expected {expected}, found {found}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
#[path = "../../tests/src_inline/sce/mod.rs"]
mod tests;
