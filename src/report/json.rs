use std::path::Path;

use crate::pipeline::stage5_report::{QcSummary, Stage5Error};

pub fn write_summary(path: &Path, summary: &QcSummary) -> Result<(), Stage5Error> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

