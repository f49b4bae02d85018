use crate::error::ConfigError;
use crate::filter::DEFAULT_SEED;
use crate::types::{Dimension, Measure};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub filter: FilterSection,
    pub report: ReportSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub sample_limit: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub output_dir: PathBuf,
    pub preview_rows: usize,
    /// Column headers, e.g. "Assignee" or "Completion Status".
    pub group_by: String,
    pub measure: String,
    pub value_counts: Vec<String>,
    pub cross_tab: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            filter: FilterSection::default(),
            report: ReportSection::default(),
        }
    }
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            sample_limit: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            preview_rows: 5,
            group_by: "Assignee".to_string(),
            measure: "Estimated Hours".to_string(),
            value_counts: vec!["Deliverable Status".to_string(), "Completion Status".to_string()],
            cross_tab: vec!["Projects".to_string(), "Completion Status".to_string()],
        }
    }
}

/// Which aggregations to produce, with field names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
    pub group_by: Dimension,
    pub measure: Measure,
    pub value_counts: Vec<Dimension>,
    pub cross_tab: (Dimension, Dimension),
}

fn dimension(name: &str) -> Result<Dimension, ConfigError> {
    name.parse().map_err(ConfigError::UnknownField)
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn plan(&self) -> Result<ReportPlan, ConfigError> {
        let r = &self.report;
        let cross_tab = match r.cross_tab.as_slice() {
            [a, b] => (dimension(a)?, dimension(b)?),
            other => {
                return Err(ConfigError::Invalid(format!(
                    "cross_tab needs exactly two fields, got {}",
                    other.len()
                )))
            }
        };
        Ok(ReportPlan {
            group_by: dimension(&r.group_by)?,
            measure: r.measure.parse().map_err(ConfigError::UnknownField)?,
            value_counts: r
                .value_counts
                .iter()
                .map(|v| dimension(v))
                .collect::<Result<_, _>>()?,
            cross_tab,
        })
    }
}

/// Read the config at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => Config::from_toml(&fs::read_to_string(p)?),
        None => Ok(Config::default()),
    }
}
