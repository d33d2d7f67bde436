use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::input::InputError;
use crate::input::barcodes::{check_barcodes, read_barcodes};
use crate::input::cache::{CacheError, SharedCache};
use crate::input::detect::{
    TenXFormat, TenXLayout, detect_10x_dir, detect_prefix, find_shared_cache_file,
    shared_cache_file_name,
};
use crate::input::features::{DuplicateName, FeatureTable, read_features};
use crate::input::meta::{MetaStats, read_cell_metadata};
use crate::input::mtx::{read_counts, read_mtx_header};
use crate::sce::{Experiment, SceError};

#[derive(Debug, Error)]
pub enum Stage1Error {
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("experiment error: {0}")]
    Sce(#[from] SceError),
    #[error(
        "matrix is {found_rows} x {found_cols} but input lists {expected_rows} features and {expected_cols} barcodes"
    )]
    DimensionMismatch {
        expected_rows: usize,
        expected_cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Standalone,
    /// Prefer the shared cache written by an upstream pipeline step.
    Pipeline,
}

#[derive(Debug, Clone)]
pub struct DatasetCtx {
    pub format: TenXFormat,
    pub matrix_path: Option<PathBuf>,
    pub features_path: Option<PathBuf>,
    pub barcodes_path: Option<PathBuf>,
    pub shared_cache_path: Option<PathBuf>,
    /// Where a shared cache for this input is expected to live.
    pub resolved_shared_cache_path: Option<PathBuf>,
    pub n_features: usize,
    pub n_cells: usize,
    pub nnz: usize,
    pub duplicate_feature_names: Vec<DuplicateName>,
    pub meta: Option<MetaStats>,
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub ctx: DatasetCtx,
    pub experiment: Experiment,
}

pub fn run_stage1(
    input_dir: &Path,
    meta_path: Option<&Path>,
    run_mode: RunMode,
    cache_override: Option<&Path>,
) -> Result<LoadedDataset, Stage1Error> {
    let mut loaded = match run_mode {
        RunMode::Standalone => load_10x(input_dir, detect_10x_dir(input_dir)?)?,
        RunMode::Pipeline => {
            let prefix = detect_prefix(input_dir)?;
            let expected = input_dir.join(shared_cache_file_name(prefix.as_deref()));
            let found = match cache_override {
                Some(path) => Some(path.to_path_buf()),
                None => find_shared_cache_file(input_dir, prefix.as_deref())?,
            };
            match found {
                Some(path) => load_shared_cache(&path)?,
                None => {
                    warn!(
                        expected_cache = %expected.display(),
                        "shared cache not found, falling back to MTX input"
                    );
                    let mut loaded = load_10x(input_dir, detect_10x_dir(input_dir)?)?;
                    loaded.ctx.resolved_shared_cache_path = Some(expected);
                    loaded
                }
            }
        }
    };

    if let Some(meta) = meta_path {
        let table = read_cell_metadata(meta, loaded.experiment.cell_names())?;
        info!(
            matched = table.stats.matched,
            missing = table.stats.missing,
            unannotated = table.stats.unannotated,
            columns = table.columns.len(),
            "cell metadata loaded"
        );
        for (name, data) in table.columns {
            loaded.experiment.col_data.insert(&name, data)?;
        }
        loaded.ctx.meta = Some(table.stats);
    }

    Ok(loaded)
}

fn load_10x(input_dir: &Path, layout: TenXLayout) -> Result<LoadedDataset, Stage1Error> {
    let barcodes = read_barcodes(&layout.barcodes_path)?;
    let features = read_features(&layout.features_path)?;

    let header = read_mtx_header(&layout.matrix_path)?;
    if header.n_rows != features.len() || header.n_cols != barcodes.len() {
        return Err(Stage1Error::DimensionMismatch {
            expected_rows: features.len(),
            expected_cols: barcodes.len(),
            found_rows: header.n_rows,
            found_cols: header.n_cols,
        });
    }
    let (header, counts) = read_counts(&layout.matrix_path)?;

    let ctx = DatasetCtx {
        format: layout.format,
        matrix_path: Some(layout.matrix_path),
        features_path: Some(layout.features_path),
        barcodes_path: Some(layout.barcodes_path),
        shared_cache_path: None,
        resolved_shared_cache_path: layout
            .prefix
            .as_deref()
            .map(|p| input_dir.join(shared_cache_file_name(Some(p)))),
        n_features: header.n_rows,
        n_cells: header.n_cols,
        nnz: counts.nnz(),
        duplicate_feature_names: features.duplicates.clone(),
        meta: None,
    };
    let experiment = build_experiment(counts, features, barcodes)?;
    Ok(LoadedDataset { ctx, experiment })
}

fn load_shared_cache(path: &Path) -> Result<LoadedDataset, Stage1Error> {
    let cache = SharedCache::open(path)?;
    let counts = cache.counts()?;
    check_barcodes(&cache.barcodes)?;
    let features = FeatureTable::from_names(cache.features.clone());
    info!(
        path = %path.display(),
        bytes = cache.file_bytes(),
        "using shared cache"
    );

    let ctx = DatasetCtx {
        format: TenXFormat::SharedCache,
        matrix_path: None,
        features_path: None,
        barcodes_path: None,
        shared_cache_path: Some(path.to_path_buf()),
        resolved_shared_cache_path: Some(path.to_path_buf()),
        n_features: cache.header.n_features,
        n_cells: cache.header.n_cells,
        nnz: counts.nnz(),
        duplicate_feature_names: features.duplicates.clone(),
        meta: None,
    };
    let experiment = build_experiment(counts, features, cache.barcodes.clone())?;
    Ok(LoadedDataset { ctx, experiment })
}

fn build_experiment(
    counts: crate::expr::csc::CscMatrix<u32>,
    features: FeatureTable,
    barcodes: Vec<String>,
) -> Result<Experiment, Stage1Error> {
    if !features.duplicates.is_empty() {
        warn!(
            count = features.duplicates.len(),
            "duplicate feature names; lookups by name use the first occurrence"
        );
    }
    Ok(Experiment::from_counts(
        counts,
        features.ids,
        features.names,
        barcodes,
    )?)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_load.rs"]
mod tests;
