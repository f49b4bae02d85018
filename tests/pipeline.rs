use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use task_timeline::loader::load_and_clean;
use task_timeline::reports::{group_sum, summarize, value_counts, GroupKey};
use task_timeline::{
    apply, CompletionStatus, DateRange, Dimension, FilterSpec, Measure, PipelineError,
    Selection, Session,
};

const EXPORT: &str = "\
Name,Assignee,Projects,Deliverable Status,Start Date,Due Date,Estimated Hours,Harvest Hours,Number of Delays,Overdue,Created At,Completed At,Last Modified,Job Category,Billable or Non-Billable,Delay Rationale,Task ID
Kickoff,Alice,Apollo,Done,2024-01-01,2024-01-10,4,3.5,0,false,2023-12-20,2024-01-05,2024-01-05,Planning,Billable,,T-1
Wireframes,Bob,Apollo,In Review,2024-01-08,2024-01-22,12,14,1,true,2023-12-21,,2024-01-23,Design,Billable,Client feedback,T-2
Copy deck,,Apollo,Open,2024-01-15,2024-01-12,3,,0,,2023-12-22,,,Content,Non-Billable,,T-3
API spike,Carol,Gemini,Done,01/03/2024,01/09/2024,\"1,000\",6,0,no,,2024-01-09,,Engineering,Billable,,T-4
QA pass,Alice,Gemini,,2024-02-01,unknown,n/a,2,2,yes,,,,QA,Billable,Scope change,T-5
";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn export_file() -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(EXPORT.as_bytes()).unwrap();
    f
}

#[test]
fn full_export_is_derived() {
    let file = export_file();
    let (batch, report) = load_and_clean(file.path()).unwrap();
    assert_eq!(report.total_rows, 5);
    assert_eq!(report.warnings.dates, 1);
    assert_eq!(report.warnings.numbers, 1);
    assert_eq!(batch.len(), 5);

    let durations: Vec<Option<i64>> = batch.tasks.iter().map(|t| t.duration_days).collect();
    assert_eq!(durations, vec![Some(9), Some(14), Some(-3), Some(6), None]);

    let statuses: Vec<CompletionStatus> =
        batch.tasks.iter().map(|t| t.completion_status).collect();
    assert_eq!(
        statuses,
        vec![
            CompletionStatus::Completed,
            CompletionStatus::Overdue,
            CompletionStatus::InProgress,
            CompletionStatus::Completed,
            CompletionStatus::Overdue,
        ]
    );

    let spike = &batch.tasks[3];
    assert_eq!(spike.estimated_hours, 1000.0);
    assert_eq!(spike.start_date, Some(ymd(2024, 1, 3)));
    assert_eq!(batch.tasks[4].estimated_hours, 0.0);
    assert_eq!(batch.tasks[1].delay_rationale.as_deref(), Some("Client feedback"));
}

#[test]
fn missing_required_columns_are_reported() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(b"Title,Start Date\nx,2024-01-01\n").unwrap();
    match load_and_clean(f.path()) {
        Err(PipelineError::Schema(e)) => {
            assert_eq!(e.to_string(), "missing required columns: Name, Due Date")
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn filtered_aggregates_agree_with_predicate() {
    let mut session = Session::new();
    let loaded = session.upload(EXPORT.as_bytes()).unwrap();
    let spec = FilterSpec {
        assignees: Selection::only(["Alice", "Bob"]),
        ..FilterSpec::default()
    };
    let filtered = session.filter(&spec).unwrap();
    let names: Vec<&str> = filtered.batch.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Kickoff", "Wireframes", "QA pass"]);

    let grouped: f64 = group_sum(&filtered.batch.tasks, Dimension::Project, Measure::ActualHours)
        .iter()
        .map(|(_, v)| v)
        .sum();
    let direct: f64 = loaded
        .batch
        .tasks
        .iter()
        .filter(|t| matches!(t.assignee.as_deref(), Some("Alice") | Some("Bob")))
        .map(|t| t.actual_hours)
        .sum();
    assert_eq!(grouped, direct);
    assert_eq!(grouped, 19.5);
}

#[test]
fn date_window_and_status_filter() {
    let file = export_file();
    let (batch, _) = load_and_clean(file.path()).unwrap();
    let spec = FilterSpec {
        date_range: Some(DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 31))),
        statuses: Selection::only(["Done"]),
        ..FilterSpec::default()
    };
    let f = apply(&batch, &spec);
    let ids: Vec<&str> = f.batch.tasks.iter().filter_map(|t| t.task_id.as_deref()).collect();
    assert_eq!(ids, vec!["T-1", "T-4"]);
    assert_eq!(apply(&f.batch, &spec).batch.tasks, f.batch.tasks);
}

#[test]
fn summary_of_empty_filter_is_zeroed() {
    let mut session = Session::new();
    session.upload(EXPORT.as_bytes()).unwrap();
    let spec = FilterSpec {
        projects: Selection::only(["Mercury"]),
        ..FilterSpec::default()
    };
    let filtered = session.filter(&spec).unwrap();
    let s = summarize(&filtered.batch.tasks);
    assert_eq!(s.total_tasks, 0);
    assert_eq!(s.completed_pct, 0.0);
    assert!(value_counts(&filtered.batch.tasks, Dimension::Assignee).is_empty());
}

#[test]
fn status_counts_over_full_batch() {
    let mut session = Session::new();
    let loaded = session.upload(EXPORT.as_bytes()).unwrap();
    let s = summarize(&loaded.batch.tasks);
    assert_eq!(s.by_status.completed, 2);
    assert_eq!(s.by_status.overdue, 2);
    assert_eq!(s.by_status.in_progress, 1);
    assert_eq!(s.completed_pct, 40.0);
    assert_eq!(s.total_estimated_hours, 1019.0);

    let counts = value_counts(&loaded.batch.tasks, Dimension::DeliverableStatus);
    assert_eq!(counts[0], (GroupKey::Value("Done".into()), 2));
    assert!(counts.contains(&(GroupKey::Missing, 1)));
}

#[test]
fn sample_is_stable_across_sessions() {
    let spec = FilterSpec {
        sample_limit: Some(2),
        seed: 11,
        ..FilterSpec::default()
    };
    let mut a = Session::new();
    let mut b = Session::new();
    a.upload(EXPORT.as_bytes()).unwrap();
    b.upload(EXPORT.as_bytes()).unwrap();
    let fa = a.filter(&spec).unwrap();
    let fb = b.filter(&spec).unwrap();
    assert!(fa.sampled);
    assert_eq!(fa.batch.len(), 2);
    assert_eq!(fa.batch.tasks, fb.batch.tasks);
}
