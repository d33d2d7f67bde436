use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::qc::cell::DEFAULT_PERCENT_TOP;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("toml parse error in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// QC run settings; every field has a default so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QcConfig {
    /// Single subset file; takes precedence over `subsets_dir`.
    pub subsets_file: Option<PathBuf>,
    /// Directory of `*.toml` subset files; unset uses the bundled assets.
    pub subsets_dir: Option<PathBuf>,
    pub percent_top: Vec<usize>,
    pub detection_limit: f64,
    pub nmads: f64,
    /// Subset percentages checked by the high-outlier filter.
    pub sub_fields: Vec<String>,
    pub batch_column: Option<String>,
    pub plot: PlotConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    pub n: usize,
    pub colour_cells_by: Option<String>,
    pub drop_features: Vec<String>,
    /// Logical feature column marking controls; unset uses the first
    /// `sub_fields` subset.
    pub controls: Option<String>,
    pub as_percentage: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            subsets_file: None,
            subsets_dir: None,
            percent_top: DEFAULT_PERCENT_TOP.to_vec(),
            detection_limit: 0.0,
            nmads: 3.0,
            sub_fields: vec!["mito".to_string()],
            batch_column: None,
            plot: PlotConfig::default(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            n: 50,
            colour_cells_by: None,
            drop_features: Vec::new(),
            controls: None,
            as_percentage: true,
            width: 900,
            height: 1000,
        }
    }
}

impl QcConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Toml { source, .. } => ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: QcConfig = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.nmads.is_finite() && self.nmads > 0.0) {
            return Err(ConfigError::Invalid {
                field: "nmads",
                reason: format!("must be positive, got {}", self.nmads),
            });
        }
        if !(self.detection_limit.is_finite() && self.detection_limit >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "detection_limit",
                reason: format!("must be non-negative, got {}", self.detection_limit),
            });
        }
        if self.percent_top.contains(&0) {
            return Err(ConfigError::Invalid {
                field: "percent_top",
                reason: "entries must be at least 1".to_string(),
            });
        }
        if self.plot.n == 0 {
            return Err(ConfigError::Invalid {
                field: "plot.n",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.plot.width < 100 || self.plot.height < 100 {
            return Err(ConfigError::Invalid {
                field: "plot.width/plot.height",
                reason: "must be at least 100 pixels".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/config.rs"]
mod tests;
