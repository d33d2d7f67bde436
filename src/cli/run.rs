use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use tracing::info;

use crate::config::QcConfig;
use crate::input::cache::write_shared_cache;
use crate::input::detect::shared_cache_file_name;
use crate::pipeline::stage1_load::{RunMode, run_stage1};
use crate::pipeline::stage2_metrics::run_stage2;
use crate::pipeline::stage3_normalize::run_stage3;
use crate::pipeline::stage4_plots::run_stage4;
use crate::pipeline::stage5_report::{build_summary, run_stage5};
use crate::sce::{Assay, Experiment};

pub const PIPELINE_SUBDIR: &str = "scqc";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input 10x directory
    #[arg(long)]
    pub(crate) input: PathBuf,

    /// Output directory
    #[arg(long)]
    pub(crate) out: PathBuf,

    /// Optional cell metadata TSV with a cell_id column
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Optional QC configuration (TOML)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Input source mode
    #[arg(long, value_enum, default_value = "standalone")]
    pub(crate) run_mode: RunModeArg,

    /// Optional explicit shared cache path (kira-organelle.bin)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Number of features in the highest-expression plot
    #[arg(long)]
    pub(crate) top: Option<usize>,

    /// Skip SVG rendering; tables are still written
    #[arg(long)]
    pub(crate) no_plots: bool,

    /// Also write the loaded counts as a shared cache into the output directory
    #[arg(long)]
    write_cache: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunModeArg {
    Standalone,
    Pipeline,
}

impl From<RunModeArg> for RunMode {
    fn from(value: RunModeArg) -> Self {
        match value {
            RunModeArg::Standalone => RunMode::Standalone,
            RunModeArg::Pipeline => RunMode::Pipeline,
        }
    }
}

pub fn handle(args: RunArgs) -> anyhow::Result<()> {
    let mut config = QcConfig::load_or_default(args.config.as_deref())?;
    if let Some(top) = args.top {
        anyhow::ensure!(top > 0, "--top must be at least 1");
        config.plot.n = top;
    }

    let stage_out = match args.run_mode {
        RunModeArg::Pipeline => args.out.join(PIPELINE_SUBDIR),
        RunModeArg::Standalone => args.out.clone(),
    };
    std::fs::create_dir_all(&stage_out)?;

    let start = Instant::now();
    info!(stage = "stage1_load", "starting stage");
    let loaded = run_stage1(
        &args.input,
        args.meta.as_deref(),
        args.run_mode.into(),
        args.cache.as_deref(),
    )?;
    info!(
        stage = "stage1_load",
        elapsed_ms = start.elapsed().as_millis(),
        format = %loaded.ctx.format,
        features = loaded.ctx.n_features,
        cells = loaded.ctx.n_cells,
        nnz = loaded.ctx.nnz,
        "finished stage"
    );

    if args.write_cache {
        let path = stage_out.join(shared_cache_file_name(None));
        write_counts_cache(&loaded.experiment, &path)?;
        info!(path = %path.display(), "shared cache written");
    }

    let start = Instant::now();
    info!(stage = "stage2_metrics", "starting stage");
    let (exp, metrics) = run_stage2(&loaded.experiment, &config)?;
    info!(
        stage = "stage2_metrics",
        elapsed_ms = start.elapsed().as_millis(),
        subsets = metrics.subsets.len(),
        discarded = metrics.quick.n_discarded(),
        "finished stage"
    );

    let start = Instant::now();
    info!(stage = "stage3_normalize", "starting stage");
    let (exp, size_factors) = run_stage3(&exp)?;
    info!(
        stage = "stage3_normalize",
        elapsed_ms = start.elapsed().as_millis(),
        median_size_factor = size_factors.median,
        "finished stage"
    );

    let start = Instant::now();
    info!(stage = "stage4_plots", "starting stage");
    let controls = config.plot.controls.clone().or_else(|| {
        metrics
            .sub_fields
            .first()
            .map(|name| format!("is_{name}"))
            .filter(|col| exp.row_data.contains(col))
    });
    let plots = run_stage4(&exp, &config.plot, controls, &stage_out, !args.no_plots)?;
    info!(
        stage = "stage4_plots",
        elapsed_ms = start.elapsed().as_millis(),
        "finished stage"
    );

    let start = Instant::now();
    info!(stage = "stage5_report", "starting stage");
    let summary = build_summary(&loaded.ctx, &metrics, &size_factors, &plots, config.nmads);
    run_stage5(&exp, &summary, &stage_out, args.run_mode.into())?;
    info!(
        stage = "stage5_report",
        elapsed_ms = start.elapsed().as_millis(),
        "finished stage"
    );
    Ok(())
}

/// Writes the integer `counts` assay as a shared cache.
pub(crate) fn write_counts_cache(exp: &Experiment, path: &Path) -> anyhow::Result<()> {
    let Assay::Counts(counts) = exp.assay("counts")? else {
        anyhow::bail!("assay 'counts' does not hold integer counts; cannot write a shared cache");
    };
    write_shared_cache(path, counts, exp.feature_names(), exp.cell_names())?;
    Ok(())
}
