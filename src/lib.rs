pub mod cli;
pub mod config;
pub mod expr;
pub mod input;
pub mod pipeline;
pub mod plot;
pub mod qc;
pub mod report;
pub mod sce;

pub mod prelude {
    pub use crate::config::QcConfig;
    pub use crate::expr::csc::CscMatrix;
    pub use crate::expr::normalize::{LogNormParams, log_norm_counts};
    pub use crate::input::detect::TenXFormat;
    pub use crate::pipeline::stage1_load::DatasetCtx;
    pub use crate::plot::highest_exprs::{HighestExprsParams, plot_highest_exprs};
    pub use crate::plot::metadata::{MetadataPlotParams, plot_col_data, plot_row_data};
    pub use crate::qc::cell::{CellQcParams, per_cell_qc_metrics};
    pub use crate::qc::feature::{FeatureQcParams, per_feature_qc_metrics};
    pub use crate::qc::outliers::{OutlierParams, is_outlier, quick_per_cell_qc};
    pub use crate::sce::retrieve::ValueSpec;
    pub use crate::sce::{Annotations, Assay, ColumnData, Experiment};
}
