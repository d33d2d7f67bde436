use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::expr::normalize::{LogNormParams, NormalizeError, log_norm_counts};
use crate::qc::outliers::median;
use crate::sce::{Experiment, SceError};

#[derive(Debug, Error)]
pub enum Stage3Error {
    #[error("normalization error: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("experiment error: {0}")]
    Sce(#[from] SceError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeFactorSummary {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    /// Cells with no counts; their factor is set to 1.
    pub empty_cells: usize,
}

/// Library size factors and the `logcounts` assay.
pub fn run_stage3(exp: &Experiment) -> Result<(Experiment, SizeFactorSummary), Stage3Error> {
    let counts = exp.assay("counts")?;
    let mut factors = counts.library_size_factors();
    let mut empty_cells = 0usize;
    for f in factors.iter_mut() {
        if !(f.is_finite() && *f > 0.0) {
            *f = 1.0;
            empty_cells += 1;
        }
    }
    if empty_cells > 0 {
        warn!(cells = empty_cells, "cells without counts get a unit size factor");
    }

    let mut with_factors = exp.clone();
    with_factors.size_factors = Some(factors);
    let out = log_norm_counts(&with_factors, &LogNormParams::default())?;

    let mut sorted = out.size_factors.clone().unwrap_or_default();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let summary = SizeFactorSummary {
        min: sorted.first().copied().unwrap_or(f64::NAN),
        median: median(&sorted),
        max: sorted.last().copied().unwrap_or(f64::NAN),
        empty_cells,
    };
    Ok((out, summary))
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_normalize.rs"]
mod tests;
