// Entry point and high-level CLI flow.
//
// - Load the export through the pipeline and print load diagnostics.
// - Apply the filter flags and report whether sampling kicked in.
// - Print a Markdown preview of every aggregation, and export each one as
//   CSV plus the summary metrics as JSON.
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use task_timeline::cache::{Loaded, Session};
use task_timeline::config::{load_config, Config, ReportPlan};
use task_timeline::filter::{filter_options, Filtered};
use task_timeline::types::{Dimension, SummaryMetrics};
use task_timeline::{output, reports, util};
use tracing_subscriber::EnvFilter;

const TIMELINE_PAD_DAYS: u64 = 5;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn slug(dim: Dimension) -> String {
    dim.label().to_ascii_lowercase().replace(' ', "_")
}

fn print_load(loaded: &Loaded) {
    let report = &loaded.report;
    println!(
        "Processing dataset... ({} tasks loaded)",
        util::format_int(report.total_rows)
    );
    if report.lossy_rows > 0 || report.skipped_rows > 0 {
        println!(
            "Note: {} rows had unreadable characters and {} rows could not be read at all.",
            util::format_int(report.lossy_rows),
            util::format_int(report.skipped_rows)
        );
    }
    if report.warnings.total() > 0 {
        println!(
            "Note: {} values could not be parsed ({} dates, {} numbers, {} flags) and were left blank or zero.",
            util::format_int(report.warnings.total()),
            report.warnings.dates,
            report.warnings.numbers,
            report.warnings.booleans
        );
    }
    let opts = filter_options(&loaded.batch);
    println!("Assignees: {}", opts.assignees.join(", "));
    println!("Projects: {}", opts.projects.join(", "));
    println!("Deliverable statuses: {}\n", opts.statuses.join(", "));
}

fn sample_note(filtered: &Filtered) -> Option<String> {
    filtered.sampled.then(|| {
        format!(
            "Sample of {} out of {} matching tasks",
            util::format_int(filtered.batch.len()),
            util::format_int(filtered.matched)
        )
    })
}

/// Print and export every aggregation over the filtered tasks.
fn handle_reports(filtered: &Filtered, plan: &ReportPlan, config: &Config) -> Result<()> {
    let dir = &config.report.output_dir;
    let rows = config.report.preview_rows;
    let tasks = &filtered.batch.tasks;
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let note = sample_note(filtered);
    if let Some(n) = &note {
        println!("{}\n", n);
    }
    match reports::timeline_window(tasks, TIMELINE_PAD_DAYS) {
        Some((lo, hi)) => println!("Timeline window: {} to {}\n", lo, hi),
        None => println!("Timeline window: (no dated tasks)\n"),
    }

    let sums = reports::value_rows(&reports::group_sum(tasks, plan.group_by, plan.measure));
    let title = format!("Total {} by {}", plan.measure.label(), plan.group_by.label());
    export(dir, "group_sum.csv", &title, note.as_deref(), &sums, rows)?;

    let means = reports::value_rows(&reports::group_mean(tasks, plan.group_by, plan.measure));
    let title = format!("Average {} by {}", plan.measure.label(), plan.group_by.label());
    export(dir, "group_mean.csv", &title, note.as_deref(), &means, rows)?;

    for dim in &plan.value_counts {
        let counts = reports::count_rows(&reports::value_counts(tasks, *dim));
        let file = format!("value_counts_{}.csv", slug(*dim));
        let title = format!("Tasks by {}", dim.label());
        export(dir, &file, &title, note.as_deref(), &counts, rows)?;
    }

    let trend = reports::trend_rows(&reports::weekly_trend(tasks));
    let title = "Completed Tasks per Week";
    export(dir, "weekly_trend.csv", title, note.as_deref(), &trend, rows)?;

    let (r, c) = plan.cross_tab;
    let tab = reports::cross_tab_rows(&reports::cross_tab(tasks, r, c));
    let title = format!("Tasks by {} and {}", r.label(), c.label());
    export(dir, "cross_tab.csv", &title, note.as_deref(), &tab, rows)?;

    let summary = reports::summarize(tasks);
    let path = dir.join("summary.json");
    output::write_json(&path, &summary).with_context(|| format!("writing {}", path.display()))?;
    println!("Project Summary (summary.json):");
    for line in summary_lines(&summary) {
        println!("{}", line);
    }
    Ok(())
}

fn summary_lines(summary: &SummaryMetrics) -> Vec<String> {
    let mut lines = vec![format!(
        "Total number of tasks: {}",
        util::format_int(summary.total_tasks)
    )];
    if let (Some(s), Some(e)) = (summary.project_start, summary.project_end) {
        lines.push(format!("Project dates: {} to {}", s, e));
    }
    lines.push(format!("Number of assignees: {}", summary.distinct_assignees));
    lines.push(format!(
        "Total estimated hours: {}",
        util::format_number(summary.total_estimated_hours, 2)
    ));
    lines.push(format!(
        "Total actual hours: {}",
        util::format_number(summary.total_actual_hours, 2)
    ));
    lines.push(format!("Number of overdue tasks: {}", summary.overdue_flagged));
    lines.push(format!(
        "Past due and not completed: {}",
        summary.by_status.overdue
    ));
    lines.push(format!(
        "Completed tasks: {} ({}%)",
        summary.completed_tasks,
        util::format_number(summary.completed_pct, 2)
    ));
    lines
}

fn export<T>(
    dir: &Path,
    file: &str,
    title: &str,
    note: Option<&str>,
    rows: &[T],
    max_rows: usize,
) -> Result<()>
where
    T: serde::Serialize + tabled::Tabled + Clone,
{
    let path = dir.join(file);
    output::write_csv(&path, rows).with_context(|| format!("writing {}", path.display()))?;
    output::preview_table(title, note, rows, max_rows);
    println!("(Full table exported to {})\n", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    let mut config = load_config(args.config.as_deref()).context("loading config")?;
    args.apply_overrides(&mut config);
    init_logging(&config.log_level);
    let plan = config.plan().context("resolving report fields")?;

    let bytes = fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let mut session = Session::new();
    let loaded = session.upload(&bytes)?;
    print_load(&loaded);

    let spec = args.filter_spec(&config);
    let Some(filtered) = session.filter(&spec) else {
        anyhow::bail!("no dataset loaded");
    };
    handle_reports(&filtered, &plan, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use task_timeline::types::StatusCounts;

    #[test]
    fn overdue_line_counts_flagged_tasks() {
        let summary = SummaryMetrics {
            total_tasks: 4,
            by_status: StatusCounts {
                completed: 3,
                overdue: 1,
                in_progress: 0,
            },
            total_estimated_hours: 10.0,
            total_actual_hours: 12.5,
            completed_tasks: 3,
            completed_pct: 75.0,
            overdue_flagged: 2,
            distinct_assignees: 2,
            project_start: None,
            project_end: None,
        };
        let lines = summary_lines(&summary);
        assert!(lines.contains(&"Number of overdue tasks: 2".to_string()));
        assert!(lines.contains(&"Past due and not completed: 1".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Project dates")));
    }
}
