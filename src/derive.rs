use crate::types::{
    BatchId, Column, CompletionStatus, NormalizedBatch, NormalizedRecord, ParseWarnings, Task,
    TaskBatch,
};
use crate::util::{clean_text, days_diff, parse_bool_safe, parse_f64_safe, Cell};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Whole days from `start` to `due`. Negative spans are kept as-is.
pub fn duration_days(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Option<i64> {
    Some(days_diff(start?, due?))
}

/// Completed beats Overdue beats In Progress.
pub fn completion_status(completed_at: Option<NaiveDate>, overdue: Option<bool>) -> CompletionStatus {
    if completed_at.is_some() {
        CompletionStatus::Completed
    } else if overdue == Some(true) {
        CompletionStatus::Overdue
    } else {
        CompletionStatus::InProgress
    }
}

fn number(rec: &NormalizedRecord, col: Column, warnings: &mut ParseWarnings) -> f64 {
    // Absent columns read as blank, which defaults to 0.
    match parse_f64_safe(rec.value(col)) {
        Cell::Parsed(v) => v,
        Cell::Blank => 0.0,
        Cell::Invalid => {
            warnings.record(col);
            0.0
        }
    }
}

fn derive_task(rec: &NormalizedRecord, warnings: &mut ParseWarnings) -> Task {
    let overdue = match parse_bool_safe(rec.value(Column::Overdue)) {
        Cell::Invalid => {
            warnings.record(Column::Overdue);
            None
        }
        cell => cell.value(),
    };
    let extra = rec
        .values
        .iter()
        .filter(|(h, _)| Column::from_header(h).is_none())
        .map(|(h, v)| (h.clone(), v.clone()))
        .collect::<BTreeMap<_, _>>();
    let d = rec.dates;

    Task {
        row: rec.row,
        name: rec.value(Column::Name).unwrap_or("").trim().to_string(),
        start_date: d.start_date,
        due_date: d.due_date,
        created_at: d.created_at,
        completed_at: d.completed_at,
        last_modified: d.last_modified,
        assignee: clean_text(rec.value(Column::Assignee)),
        project: clean_text(rec.value(Column::Projects)),
        deliverable_status: clean_text(rec.value(Column::DeliverableStatus)),
        job_category: clean_text(rec.value(Column::JobCategory)),
        billable_flag: clean_text(rec.value(Column::Billable)),
        delay_rationale: clean_text(rec.value(Column::DelayRationale)),
        task_id: clean_text(rec.value(Column::TaskId)),
        estimated_hours: number(rec, Column::EstimatedHours, warnings),
        actual_hours: number(rec, Column::HarvestHours, warnings),
        number_of_delays: number(rec, Column::NumberOfDelays, warnings),
        overdue,
        duration_days: duration_days(d.start_date, d.due_date),
        completion_status: completion_status(d.completed_at, overdue),
        extra,
    }
}

/// Build the task batch from a normalized one. Returns the recoveries made
/// while coercing numeric and boolean cells.
pub fn derive(batch: &NormalizedBatch, id: BatchId) -> (TaskBatch, ParseWarnings) {
    let mut warnings = ParseWarnings::default();
    let tasks = batch
        .records
        .iter()
        .map(|rec| derive_task(rec, &mut warnings))
        .collect();
    let columns: BTreeSet<Column> = batch
        .headers
        .iter()
        .filter_map(|h| Column::from_header(h))
        .collect();
    (TaskBatch { id, columns, tasks }, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::types::RawBatch;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn derive_rows(headers: &[&str], rows: &[&[&str]]) -> (TaskBatch, ParseWarnings) {
        let raw = RawBatch {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        };
        derive(&normalize(&raw), BatchId("test".into()))
    }

    #[test]
    fn duration_is_null_propagating() {
        assert_eq!(duration_days(Some(ymd(2024, 1, 1)), Some(ymd(2024, 1, 10))), Some(9));
        assert_eq!(duration_days(Some(ymd(2024, 1, 10)), Some(ymd(2024, 1, 1))), Some(-9));
        assert_eq!(duration_days(None, Some(ymd(2024, 1, 1))), None);
        assert_eq!(duration_days(Some(ymd(2024, 1, 1)), None), None);
    }

    #[test]
    fn status_precedence() {
        let d = Some(ymd(2024, 1, 5));
        assert_eq!(completion_status(d, Some(true)), CompletionStatus::Completed);
        assert_eq!(completion_status(d, None), CompletionStatus::Completed);
        assert_eq!(completion_status(None, Some(true)), CompletionStatus::Overdue);
        assert_eq!(completion_status(None, Some(false)), CompletionStatus::InProgress);
        assert_eq!(completion_status(None, None), CompletionStatus::InProgress);
    }

    #[test]
    fn three_task_scenario() {
        let (batch, _) = derive_rows(
            &["Name", "Start Date", "Due Date", "Completed At", "Overdue"],
            &[
                &["A", "", "", "2024-01-05", ""],
                &["B", "", "", "", "true"],
                &["C", "", "", "", ""],
            ],
        );
        let statuses: Vec<_> = batch.tasks.iter().map(|t| t.completion_status).collect();
        assert_eq!(
            statuses,
            vec![
                CompletionStatus::Completed,
                CompletionStatus::Overdue,
                CompletionStatus::InProgress
            ]
        );
    }

    #[test]
    fn missing_numeric_columns_default_to_zero() {
        let (batch, warnings) = derive_rows(
            &["Name", "Start Date", "Due Date"],
            &[&["A", "2024-01-01", "2024-01-10"]],
        );
        let t = &batch.tasks[0];
        assert_eq!(t.estimated_hours, 0.0);
        assert_eq!(t.actual_hours, 0.0);
        assert_eq!(t.number_of_delays, 0.0);
        assert_eq!(t.duration_days, Some(9));
        assert_eq!(warnings.total(), 0);
        assert!(!batch.has_column(Column::EstimatedHours));
    }

    #[test]
    fn unparsable_values_are_recovered_and_counted() {
        let (batch, warnings) = derive_rows(
            &["Name", "Start Date", "Due Date", "Estimated Hours", "Harvest Hours", "Overdue"],
            &[&["A", "", "", "lots", "3.5", "perhaps"], &["B", "", "", "-2", "", "no"]],
        );
        assert_eq!(batch.tasks[0].estimated_hours, 0.0);
        assert_eq!(batch.tasks[0].actual_hours, 3.5);
        assert_eq!(batch.tasks[0].overdue, None);
        assert_eq!(batch.tasks[1].estimated_hours, 0.0);
        assert_eq!(batch.tasks[1].overdue, Some(false));
        assert_eq!(warnings.numbers, 2);
        assert_eq!(warnings.booleans, 1);
        assert_eq!(warnings.by_column.get("Estimated Hours"), Some(&2));
    }

    #[test]
    fn text_fields_are_trimmed_and_extras_kept() {
        let (batch, _) = derive_rows(
            &["Name", "Start Date", "Due Date", "Assignee", "Projects", "Priority"],
            &[&[" Write docs ", "", "", "  ", "Apollo", "P1"]],
        );
        let t = &batch.tasks[0];
        assert_eq!(t.name, "Write docs");
        assert_eq!(t.assignee, None);
        assert_eq!(t.project.as_deref(), Some("Apollo"));
        assert_eq!(t.extra.get("Priority").map(String::as_str), Some("P1"));
    }
}
