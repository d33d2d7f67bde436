use std::path::PathBuf;

use clap::{Args, Subcommand};
use tracing::info;

use crate::plot::highest_exprs::{HighestExprsParams, plot_highest_exprs};
use crate::plot::render::{DEFAULT_SIZE, render_svg};
use crate::pipeline::stage1_load::{RunMode, run_stage1};
use crate::pipeline::stage3_normalize::run_stage3;
use crate::sce::retrieve::ValueSpec;

#[derive(Subcommand, Debug)]
pub enum PlotCommand {
    /// Features with the largest totals, one strip of cells per feature
    HighestExprs(HighestExprsArgs),
}

#[derive(Args, Debug)]
pub struct HighestExprsArgs {
    /// Input 10x directory
    #[arg(long)]
    pub(crate) input: PathBuf,

    /// Output SVG file
    #[arg(long)]
    pub(crate) out: PathBuf,

    /// Optional cell metadata TSV, for --colour-by
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Number of features to show
    #[arg(long, default_value_t = 50)]
    pub(crate) n: usize,

    /// Cell metadata column or feature name used to colour the ticks
    #[arg(long)]
    pub(crate) colour_by: Option<String>,

    /// Feature name or id to exclude; repeatable
    #[arg(long = "drop")]
    pub(crate) drop: Vec<String>,

    /// Plot raw assay values instead of the share of each cell's total
    #[arg(long)]
    pub(crate) no_percentage: bool,

    /// Assay to rank and plot (counts or logcounts)
    #[arg(long, default_value = "counts")]
    pub(crate) exprs_values: String,
}

pub fn handle(cmd: PlotCommand) -> anyhow::Result<()> {
    match cmd {
        PlotCommand::HighestExprs(args) => highest_exprs(args),
    }
}

fn highest_exprs(args: HighestExprsArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.n > 0, "--n must be at least 1");
    let loaded = run_stage1(&args.input, args.meta.as_deref(), RunMode::Standalone, None)?;
    let exp = if args.exprs_values == "counts" {
        loaded.experiment
    } else {
        run_stage3(&loaded.experiment)?.0
    };

    let params = HighestExprsParams {
        n: args.n,
        exprs_values: args.exprs_values.clone(),
        colour_cells_by: args.colour_by.as_deref().map(ValueSpec::from),
        drop_features: args.drop.clone(),
        as_percentage: !args.no_percentage,
        ..HighestExprsParams::default()
    };
    let plot = plot_highest_exprs(&exp, &params)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    render_svg(&plot.chart, &args.out, DEFAULT_SIZE)?;
    info!(
        path = %args.out.display(),
        features = plot.features.len(),
        "highest-expression plot written"
    );
    Ok(())
}
