use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::input::InputError;

const SHARED_CACHE_SUFFIX: &str = "kira-organelle.bin";

/// Which 10x layout supplied the feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenXFormat {
    /// `genes.tsv`
    TenXv2,
    /// `features.tsv`
    TenXv3,
    /// Counts came from the shared cache.
    SharedCache,
}

impl fmt::Display for TenXFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TenXFormat::TenXv2 => "tenx_v2",
            TenXFormat::TenXv3 => "tenx_v3",
            TenXFormat::SharedCache => "shared_cache",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TenXLayout {
    pub format: TenXFormat,
    pub matrix_path: PathBuf,
    pub features_path: PathBuf,
    pub barcodes_path: PathBuf,
    pub prefix: Option<String>,
}

pub fn detect_10x_dir(dir: &Path) -> Result<TenXLayout, InputError> {
    let found = kira_scio::discover(dir).map_err(|e| InputError::MissingFile(e.message))?;
    let barcodes_path = found
        .barcodes
        .ok_or_else(|| InputError::MissingFile("barcodes.tsv[.gz]".to_string()))?;
    let (features_path, format) = match (found.features, found.genes) {
        (Some(features), _) => (features, TenXFormat::TenXv3),
        (None, Some(genes)) => (genes, TenXFormat::TenXv2),
        (None, None) => {
            return Err(InputError::MissingFile(
                "features.tsv/genes.tsv[.gz]".to_string(),
            ));
        }
    };
    Ok(TenXLayout {
        format,
        matrix_path: found.matrix,
        features_path,
        barcodes_path,
        prefix: found.prefix,
    })
}

pub fn detect_prefix(dir: &Path) -> Result<Option<String>, InputError> {
    kira_scio::detect_prefix(dir).map_err(|e| InputError::InvalidTsvRow {
        line: 0,
        reason: e.to_string(),
    })
}

pub fn shared_cache_file_name(prefix: Option<&str>) -> String {
    kira_scio::resolve_shared_cache_filename(prefix)
}

/// Exact `<prefix>.kira-organelle.bin` first, otherwise the lexicographically
/// first file in `dir` carrying the cache suffix.
pub fn find_shared_cache_file(
    dir: &Path,
    prefix: Option<&str>,
) -> Result<Option<PathBuf>, InputError> {
    let exact = dir.join(shared_cache_file_name(prefix));
    if exact.is_file() {
        return Ok(Some(exact));
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && entry.file_name().to_string_lossy().ends_with(SHARED_CACHE_SUFFIX)
        {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    if candidates.len() > 1 {
        warn!(
            count = candidates.len(),
            selected = %candidates[0].display(),
            "multiple shared cache files found; using the first"
        );
    }
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/detect.rs"]
mod tests;
