use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use tracing::info;

use crate::pipeline::stage1_load::{DatasetCtx, RunMode, run_stage1};

pub const VALIDATE_TSV: &str = "validate.tsv";
pub const FEATURE_WARNINGS_TSV: &str = "feature_name_warnings.tsv";

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Input 10x directory
    #[arg(long)]
    pub(crate) input: PathBuf,

    /// Output directory
    #[arg(long)]
    pub(crate) out: PathBuf,

    /// Optional cell metadata TSV
    #[arg(long)]
    meta: Option<PathBuf>,
}

pub fn handle(args: ValidateArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.out)?;

    let start = Instant::now();
    info!(stage = "stage1_load", "starting stage");
    let loaded = run_stage1(&args.input, args.meta.as_deref(), RunMode::Standalone, None)?;
    info!(
        stage = "stage1_load",
        elapsed_ms = start.elapsed().as_millis(),
        "finished stage"
    );

    write_validate(&args.out, &loaded.ctx)?;
    write_feature_warnings(&args.out, &loaded.ctx)?;
    Ok(())
}

fn path_or_dot(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

pub(crate) fn write_validate(out_dir: &Path, ctx: &DatasetCtx) -> anyhow::Result<()> {
    let meta = ctx.meta.as_ref();
    let rows = [
        ("format", ctx.format.to_string()),
        ("n_features", ctx.n_features.to_string()),
        ("n_cells", ctx.n_cells.to_string()),
        ("nnz", ctx.nnz.to_string()),
        ("features_file", path_or_dot(&ctx.features_path)),
        ("barcodes_file", path_or_dot(&ctx.barcodes_path)),
        ("matrix_file", path_or_dot(&ctx.matrix_path)),
        ("shared_cache", path_or_dot(&ctx.shared_cache_path)),
        (
            "duplicate_feature_names",
            ctx.duplicate_feature_names.len().to_string(),
        ),
        ("meta_present", meta.is_some().to_string()),
        (
            "meta_cells_matched",
            meta.map(|m| m.matched).unwrap_or(0).to_string(),
        ),
        (
            "meta_rows_unmatched",
            meta.map(|m| m.missing).unwrap_or(0).to_string(),
        ),
    ];

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(out_dir.join(VALIDATE_TSV))?;
    for (key, value) in rows {
        writer.write_record([key, value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_feature_warnings(out_dir: &Path, ctx: &DatasetCtx) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(out_dir.join(FEATURE_WARNINGS_TSV))?;
    writer.write_record(["name", "first_row", "dup_row"])?;
    for dup in &ctx.duplicate_feature_names {
        writer.write_record([
            dup.name.as_str(),
            &dup.first_row.to_string(),
            &dup.dup_row.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
