use thiserror::Error;
use tracing::{info, warn};

use crate::config::QcConfig;
use crate::qc::QcError;
use crate::qc::cell::{CellQcParams, CellQcTable, per_cell_qc_metrics};
use crate::qc::feature::{FeatureQcParams, FeatureQcTable, per_feature_qc_metrics};
use crate::qc::outliers::{QuickQcParams, QuickQcResult, quick_per_cell_qc};
use crate::qc::subsets::{
    FeatureSubset, ResolvedSubset, SubsetLoadError, default_subsets_dir, load_subsets_file,
    load_subsets_from_dir, mark_subsets, resolve_subsets,
};
use crate::sce::{Experiment, SceError};

/// Per-feature metrics over the cells that pass the quick filter.
pub const KEPT_CELLS: &str = "kept";

#[derive(Debug, Error)]
pub enum Stage2Error {
    #[error("subset definitions: {0}")]
    Subsets(#[from] SubsetLoadError),
    #[error("qc error: {0}")]
    Qc(#[from] QcError),
    #[error("experiment error: {0}")]
    Sce(#[from] SceError),
    #[error("batch column '{0}' not found in cell metadata")]
    UnknownBatchColumn(String),
    #[error("batch column '{0}' is numeric; expected labels")]
    NumericBatchColumn(String),
}

#[derive(Debug, Clone)]
pub struct MetricsCtx {
    pub subsets: Vec<ResolvedSubset>,
    pub cells: CellQcTable,
    pub features: FeatureQcTable,
    pub quick: QuickQcResult,
    pub sub_fields: Vec<String>,
}

pub fn load_subsets(config: &QcConfig) -> Result<Vec<FeatureSubset>, SubsetLoadError> {
    if let Some(file) = &config.subsets_file {
        return load_subsets_file(file);
    }
    let dir = config.subsets_dir.clone().unwrap_or_else(default_subsets_dir);
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "subset directory not found; no feature subsets used");
        return Ok(Vec::new());
    }
    load_subsets_from_dir(&dir)
}

/// Cell and feature QC metrics plus outlier flags, all written back into
/// the experiment's metadata.
pub fn run_stage2(
    exp: &Experiment,
    config: &QcConfig,
) -> Result<(Experiment, MetricsCtx), Stage2Error> {
    let defs = load_subsets(config)?;
    let subsets = resolve_subsets(&defs, exp)?;
    for subset in &subsets {
        info!(
            subset = subset.name.as_str(),
            features = subset.rows.len(),
            missing = subset.missing.len(),
            "feature subset resolved"
        );
    }
    let mut out = mark_subsets(exp, &subsets)?;

    let cells = per_cell_qc_metrics(
        &out,
        &CellQcParams {
            exprs_values: "counts".to_string(),
            subsets: subsets.clone(),
            percent_top: config.percent_top.clone(),
            detection_limit: config.detection_limit,
        },
    )?;

    let sub_fields: Vec<String> = config
        .sub_fields
        .iter()
        .filter(|name| {
            let present = cells.subset(name).is_some();
            if !present {
                warn!(subset = name.as_str(), "sub_field has no matching subset; skipped");
            }
            present
        })
        .cloned()
        .collect();
    let batch = batch_labels(&out, config.batch_column.as_deref())?;
    let quick = quick_per_cell_qc(
        &cells,
        &QuickQcParams {
            nmads: config.nmads,
            sub_fields: sub_fields.clone(),
            batch,
        },
    )?;

    let kept: Vec<bool> = quick.discard.iter().map(|d| !d).collect();
    let features = per_feature_qc_metrics(
        &out,
        &FeatureQcParams {
            exprs_values: "counts".to_string(),
            detection_limit: config.detection_limit,
            cell_subsets: vec![(KEPT_CELLS.to_string(), kept)],
        },
    )?;

    for (name, data) in cells.columns().into_iter().chain(quick.columns()) {
        out.col_data.insert(&name, data)?;
    }
    for (name, data) in features.columns() {
        out.row_data.insert(&name, data)?;
    }

    info!(
        cells = cells.len(),
        discarded = quick.n_discarded(),
        low_lib_size = quick.low_lib_size.n_outliers(),
        low_n_features = quick.low_n_features.n_outliers(),
        "quick per-cell QC"
    );

    Ok((
        out,
        MetricsCtx {
            subsets,
            cells,
            features,
            quick,
            sub_fields,
        },
    ))
}

fn batch_labels(exp: &Experiment, column: Option<&str>) -> Result<Option<Vec<String>>, Stage2Error> {
    let Some(column) = column else {
        return Ok(None);
    };
    let data = exp
        .col_data
        .get(column)
        .ok_or_else(|| Stage2Error::UnknownBatchColumn(column.to_string()))?;
    data.labels()
        .map(Some)
        .ok_or_else(|| Stage2Error::NumericBatchColumn(column.to_string()))
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_metrics.rs"]
mod tests;
