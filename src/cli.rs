use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use task_timeline::config::Config;
use task_timeline::filter::{DateRange, FilterSpec, Selection};
use task_timeline::util::parse_date_safe;

#[derive(Debug, Parser)]
#[command(name = "task-timeline", about = "Summarize a project task export", version)]
pub struct Args {
    /// CSV export with one row per task
    pub file: PathBuf,

    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Keep only these assignees (repeatable)
    #[arg(long = "assignee")]
    pub assignees: Vec<String>,

    /// Keep only these projects (repeatable)
    #[arg(long = "project")]
    pub projects: Vec<String>,

    /// Keep only these deliverable statuses (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// Earliest start date
    #[arg(long, value_parser = parse_date_arg, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Latest due date
    #[arg(long, value_parser = parse_date_arg, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Sample this many tasks when more match
    #[arg(long)]
    pub sample: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Rows shown per preview table
    #[arg(long)]
    pub preview: Option<usize>,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date_safe(Some(s))
        .value()
        .ok_or_else(|| format!("unrecognized date: {s}"))
}

fn selection(values: &[String]) -> Selection {
    if values.is_empty() {
        Selection::All
    } else {
        Selection::only(values.iter().cloned())
    }
}

impl Args {
    /// Flags win over the config file.
    pub fn filter_spec(&self, config: &Config) -> FilterSpec {
        FilterSpec {
            date_range: self.from.zip(self.to).map(|(s, e)| DateRange::new(s, e)),
            assignees: selection(&self.assignees),
            projects: selection(&self.projects),
            statuses: selection(&self.statuses),
            sample_limit: self.sample.or(config.filter.sample_limit),
            seed: self.seed.unwrap_or(config.filter.seed),
        }
    }

    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.out_dir {
            config.report.output_dir = dir.clone();
        }
        if let Some(n) = self.preview {
            config.report.preview_rows = n;
        }
    }
}
