pub mod chart;
pub mod highest_exprs;
pub mod metadata;
pub mod render;
pub mod scale;

use thiserror::Error;

use crate::sce::SceError;
use crate::sce::retrieve::RetrieveError;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error(transparent)]
    Sce(#[from] SceError),
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
    #[error("'{name}' is {kind}, expected {expected}")]
    ColumnKind {
        name: String,
        kind: &'static str,
        expected: &'static str,
    },
    #[error("no features left to plot")]
    NoFeatures,
    #[error("render error: {0}")]
    Render(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
