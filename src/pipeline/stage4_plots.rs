use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::config::PlotConfig;
use crate::plot::PlotError;
use crate::plot::highest_exprs::{HighestExprsParams, SelectedFeature, plot_highest_exprs};
use crate::plot::metadata::{MetadataPlotParams, plot_col_data};
use crate::plot::render::render_svg;
use crate::sce::Experiment;
use crate::sce::retrieve::ValueSpec;

pub const HIGHEST_EXPRS_TSV: &str = "highest_exprs.tsv";
pub const HIGHEST_EXPRS_SVG: &str = "highest_exprs.svg";
pub const SUM_DETECTED_SVG: &str = "qc_sum_detected.svg";

#[derive(Debug, Error)]
pub enum Stage4Error {
    #[error("plot error: {0}")]
    Plot(#[from] PlotError),
}

#[derive(Debug, Clone)]
pub struct PlotsCtx {
    pub highest: Vec<SelectedFeature>,
    pub written: Vec<String>,
}

pub fn highest_exprs_params(config: &PlotConfig, controls: Option<String>) -> HighestExprsParams {
    HighestExprsParams {
        n: config.n,
        colour_cells_by: config
            .colour_cells_by
            .as_deref()
            .map(ValueSpec::from),
        drop_features: config.drop_features.clone(),
        as_percentage: config.as_percentage,
        controls,
        ..HighestExprsParams::default()
    }
}

/// Highest-expression table and, unless disabled, the SVG figures.
pub fn run_stage4(
    exp: &Experiment,
    config: &PlotConfig,
    controls: Option<String>,
    out_dir: &Path,
    render: bool,
) -> Result<PlotsCtx, Stage4Error> {
    let highest = plot_highest_exprs(exp, &highest_exprs_params(config, controls))?;
    highest.write_long_tsv(&out_dir.join(HIGHEST_EXPRS_TSV))?;
    let mut written = vec![HIGHEST_EXPRS_TSV.to_string()];

    if render {
        let size = (config.width, config.height);
        render_svg(&highest.chart, &out_dir.join(HIGHEST_EXPRS_SVG), size)?;
        written.push(HIGHEST_EXPRS_SVG.to_string());

        if exp.col_data.contains("sum") && exp.col_data.contains("detected") {
            let mut params = MetadataPlotParams::new(ValueSpec::Column("detected".to_string()))
                .with_x(ValueSpec::Column("sum".to_string()));
            if exp.col_data.contains("discard") {
                params = params.with_colour(ValueSpec::Column("discard".to_string()));
            }
            let chart = plot_col_data(exp, &params)?;
            render_svg(&chart, &out_dir.join(SUM_DETECTED_SVG), (config.width, config.width))?;
            written.push(SUM_DETECTED_SVG.to_string());
        }
    }

    info!(
        features = highest.features.len(),
        files = written.len(),
        "plots written"
    );
    Ok(PlotsCtx {
        highest: highest.features,
        written,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_plots.rs"]
mod tests;
