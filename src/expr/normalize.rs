use thiserror::Error;

use crate::expr::csc::{AssayValue, CscMatrix};
use crate::sce::{Assay, Experiment, SceError};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Sce(#[from] SceError),
    #[error("size factors must be positive; {0} cells have a zero or non-finite factor")]
    NonPositiveSizeFactors(usize),
    #[error("pseudo count must be 1 to keep unstored entries at zero, got {0}")]
    UnsupportedPseudoCount(f64),
    #[error("expected {expected} size factors, got {found}")]
    SizeFactorLength { expected: usize, found: usize },
}

#[derive(Debug, Clone)]
pub struct LogNormParams {
    pub exprs_values: String,
    pub name: String,
    pub pseudo_count: f64,
    pub center_size_factors: bool,
}

impl Default for LogNormParams {
    fn default() -> Self {
        Self {
            exprs_values: "counts".to_string(),
            name: "logcounts".to_string(),
            pseudo_count: 1.0,
            center_size_factors: true,
        }
    }
}

/// Cell totals scaled to unit mean. Cells with a zero total get a zero factor.
pub fn library_size_factors<T: AssayValue>(matrix: &CscMatrix<T>) -> Vec<f64> {
    let totals = matrix.col_sums();
    if totals.is_empty() {
        return totals;
    }
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    if mean <= 0.0 {
        return vec![1.0; totals.len()];
    }
    totals.iter().map(|t| t / mean).collect()
}

fn centered(size_factors: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = size_factors
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if finite.is_empty() {
        return size_factors.to_vec();
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    size_factors.iter().map(|v| v / mean).collect()
}

/// Adds `log2(x / sf + pseudo_count)` as a new assay. Uses the experiment's
/// stored size factors, falling back to library size factors.
pub fn log_norm_counts(
    exp: &Experiment,
    params: &LogNormParams,
) -> Result<Experiment, NormalizeError> {
    if params.pseudo_count != 1.0 {
        return Err(NormalizeError::UnsupportedPseudoCount(params.pseudo_count));
    }
    let assay = exp.assay(&params.exprs_values)?;
    let raw_factors = match &exp.size_factors {
        Some(sf) => sf.clone(),
        None => assay.library_size_factors(),
    };
    if raw_factors.len() != exp.n_cells() {
        return Err(NormalizeError::SizeFactorLength {
            expected: exp.n_cells(),
            found: raw_factors.len(),
        });
    }
    let bad = raw_factors
        .iter()
        .filter(|v| !v.is_finite() || **v <= 0.0)
        .count();
    if bad > 0 {
        return Err(NormalizeError::NonPositiveSizeFactors(bad));
    }

    let factors = if params.center_size_factors {
        centered(&raw_factors)
    } else {
        raw_factors
    };
    let pseudo = params.pseudo_count;
    let logged = assay.map_values(|_, col, v| (v / factors[col] + pseudo).log2() as f32);

    let mut out = exp.clone();
    out.size_factors = Some(factors);
    out.add_assay(&params.name, Assay::Real(logged))?;
    Ok(out)
}

/// Adds counts-per-million of each cell's total as assay `cpm`.
pub fn calculate_cpm(exp: &Experiment, exprs_values: &str) -> Result<Experiment, NormalizeError> {
    let assay = exp.assay(exprs_values)?;
    let totals = assay.col_sums();
    let cpm = assay.map_values(|_, col, v| {
        let total = totals[col];
        if total > 0.0 {
            (v * 1e6 / total) as f32
        } else {
            0.0
        }
    });
    let mut out = exp.clone();
    out.add_assay("cpm", Assay::Real(cpm))?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/src_inline/expr/normalize.rs"]
mod tests;
