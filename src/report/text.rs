use std::fmt::Write;

use crate::pipeline::stage5_report::{QcSummary, Quantiles};
use crate::sce::annotations::fmt_num;

const TOP_FEATURES_SHOWN: usize = 10;

pub fn render_report(summary: &QcSummary) -> String {
    let mut out = String::new();
    out.push_str("Single-cell QC Report\n");
    out.push_str("=====================\n\n");

    let input = &summary.input;
    out.push_str("Dataset overview:\n");
    let _ = writeln!(out, "- Source: {}", input.format);
    let _ = writeln!(out, "- Features: {}", input.n_features);
    let _ = writeln!(out, "- Cells: {}", input.n_cells);
    let _ = writeln!(out, "- Non-zero entries: {}", input.nnz);
    if input.duplicate_feature_names > 0 {
        let _ = writeln!(
            out,
            "- Duplicate feature names: {}",
            input.duplicate_feature_names
        );
    }
    if let Some(matched) = input.meta_cells_matched {
        let _ = writeln!(out, "- Cells with metadata: {}", matched);
    }
    out.push('\n');

    out.push_str("Per-cell metrics (median / p90 / p99):\n");
    push_quantiles(&mut out, "Library size", &summary.cells.sum);
    push_quantiles(&mut out, "Detected features", &summary.cells.detected);
    for (name, q) in &summary.cells.subsets_percent {
        push_quantiles(&mut out, &format!("% counts in {name}"), q);
    }
    out.push('\n');

    let outliers = &summary.outliers;
    let _ = writeln!(out, "Outlier filter ({} MADs):", fmt_num(outliers.nmads));
    let _ = writeln!(out, "- Low library size: {}", outliers.low_lib_size);
    let _ = writeln!(out, "- Low detected features: {}", outliers.low_n_features);
    for (name, count) in &outliers.high_subsets_percent {
        let _ = writeln!(out, "- High {} percentage: {}", name, count);
    }
    let _ = writeln!(
        out,
        "- Discarded: {} ({:.2}%)",
        outliers.discarded,
        outliers.discarded_fraction * 100.0
    );
    out.push('\n');

    let sf = &summary.size_factors;
    out.push_str("Size factors:\n");
    let _ = writeln!(
        out,
        "- min {:.3}, median {:.3}, max {:.3}",
        sf.min, sf.median, sf.max
    );
    if sf.empty_cells > 0 {
        let _ = writeln!(out, "- Cells without counts: {}", sf.empty_cells);
    }
    out.push('\n');

    if !summary.subsets.is_empty() {
        out.push_str("Feature subsets:\n");
        for subset in &summary.subsets {
            let _ = write!(out, "- {}: {} features", subset.name, subset.n_features);
            if !subset.missing_features.is_empty() {
                let _ = write!(out, " ({} not found)", subset.missing_features.len());
            }
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("Highest expressed features:\n");
    for feature in summary.highest_exprs.iter().take(TOP_FEATURES_SHOWN) {
        let marker = if feature.is_control { " [control]" } else { "" };
        let _ = writeln!(
            out,
            "- {}: {:.2}{}",
            feature.name, feature.summary, marker
        );
    }
    out
}

fn push_quantiles(out: &mut String, label: &str, q: &Quantiles) {
    let _ = writeln!(
        out,
        "- {}: {:.2} / {:.2} / {:.2}",
        label, q.median, q.p90, q.p99
    );
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/text.rs"]
mod tests;
