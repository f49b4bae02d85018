use crate::types::{
    CompletionStatus, CrossTabRow, Dimension, GroupCountRow, GroupValueRow, Measure,
    StatusCounts, SummaryMetrics, Task, WeeklyTrendRow,
};
use crate::util::{average, format_number, percentage};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Grouping key. `Missing` collects tasks with no value and sorts after
/// every real value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupKey {
    Value(String),
    Missing,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Value(v) => f.write_str(v),
            GroupKey::Missing => f.write_str("(missing)"),
        }
    }
}

fn key_of(task: &Task, dim: Dimension) -> GroupKey {
    match task.category(dim) {
        Some(v) => GroupKey::Value(v.to_string()),
        None => GroupKey::Missing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Highest first, ties by key.
fn by_value_desc<K: Ord, V: PartialOrd>(a: &(K, V), b: &(K, V)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Sum of `measure` per group. Undefined durations count as 0 so that the
/// group totals add up to the column total.
pub fn group_sum(tasks: &[Task], dim: Dimension, measure: Measure) -> Vec<(GroupKey, f64)> {
    let mut map: HashMap<GroupKey, f64> = HashMap::new();
    for t in tasks {
        *map.entry(key_of(t, dim)).or_insert(0.0) += t.measure(measure).unwrap_or(0.0);
    }
    let mut rows: Vec<(GroupKey, f64)> = map.into_iter().collect();
    rows.sort_by(by_value_desc);
    rows
}

/// Mean of `measure` per group, ordered by key. Groups with no defined
/// value are left out.
pub fn group_mean(tasks: &[Task], dim: Dimension, measure: Measure) -> Vec<(GroupKey, f64)> {
    let mut map: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for t in tasks {
        if let Some(v) = t.measure(measure) {
            map.entry(key_of(t, dim)).or_default().push(v);
        }
    }
    map.into_iter()
        .filter_map(|(k, vals)| average(&vals).map(|m| (k, m)))
        .collect()
}

pub fn value_counts(tasks: &[Task], dim: Dimension) -> Vec<(GroupKey, usize)> {
    let mut map: HashMap<GroupKey, usize> = HashMap::new();
    for t in tasks {
        *map.entry(key_of(t, dim)).or_insert(0) += 1;
    }
    let mut rows: Vec<(GroupKey, usize)> = map.into_iter().collect();
    rows.sort_by(by_value_desc);
    rows
}

/// Completed tasks per ISO week of `completed_at`, oldest week first.
pub fn weekly_trend(tasks: &[Task]) -> Vec<(IsoWeekKey, usize)> {
    let mut map: BTreeMap<IsoWeekKey, usize> = BTreeMap::new();
    for d in tasks.iter().filter_map(|t| t.completed_at) {
        let w = d.iso_week();
        *map.entry(IsoWeekKey { year: w.year(), week: w.week() }).or_insert(0) += 1;
    }
    map.into_iter().collect()
}

pub fn cross_tab(
    tasks: &[Task],
    rows: Dimension,
    columns: Dimension,
) -> Vec<((GroupKey, GroupKey), usize)> {
    let mut map: BTreeMap<(GroupKey, GroupKey), usize> = BTreeMap::new();
    for t in tasks {
        *map.entry((key_of(t, rows), key_of(t, columns))).or_insert(0) += 1;
    }
    map.into_iter().collect()
}

pub fn summarize(tasks: &[Task]) -> SummaryMetrics {
    let total_tasks = tasks.len();
    let mut by_status = StatusCounts::default();
    for t in tasks {
        match t.completion_status {
            CompletionStatus::Completed => by_status.completed += 1,
            CompletionStatus::Overdue => by_status.overdue += 1,
            CompletionStatus::InProgress => by_status.in_progress += 1,
        }
    }
    let completed_tasks = tasks.iter().filter(|t| t.completed_at.is_some()).count();
    let assignees: HashSet<&str> = tasks.iter().filter_map(|t| t.assignee.as_deref()).collect();

    SummaryMetrics {
        total_tasks,
        by_status,
        total_estimated_hours: tasks.iter().map(|t| t.estimated_hours).sum(),
        total_actual_hours: tasks.iter().map(|t| t.actual_hours).sum(),
        completed_tasks,
        completed_pct: percentage(completed_tasks, total_tasks),
        overdue_flagged: tasks.iter().filter(|t| t.overdue == Some(true)).count(),
        distinct_assignees: assignees.len(),
        project_start: tasks.iter().filter_map(|t| t.start_date).min(),
        project_end: tasks.iter().filter_map(|t| t.due_date).max(),
    }
}

/// Earliest start and latest due date, widened by `pad_days` on each side.
/// `None` when either bound is missing or padding leaves the calendar range.
pub fn timeline_window(tasks: &[Task], pad_days: u64) -> Option<(NaiveDate, NaiveDate)> {
    let start = tasks.iter().filter_map(|t| t.start_date).min()?;
    let end = tasks.iter().filter_map(|t| t.due_date).max()?;
    let pad = Days::new(pad_days);
    Some((start.checked_sub_days(pad)?, end.checked_add_days(pad)?))
}

pub fn value_rows(rows: &[(GroupKey, f64)]) -> Vec<GroupValueRow> {
    rows.iter()
        .map(|(k, v)| GroupValueRow {
            group: k.to_string(),
            value: format_number(*v, 2),
        })
        .collect()
}

pub fn count_rows(rows: &[(GroupKey, usize)]) -> Vec<GroupCountRow> {
    rows.iter()
        .map(|(k, n)| GroupCountRow {
            group: k.to_string(),
            count: *n,
        })
        .collect()
}

pub fn cross_tab_rows(rows: &[((GroupKey, GroupKey), usize)]) -> Vec<CrossTabRow> {
    rows.iter()
        .map(|((r, c), n)| CrossTabRow {
            row: r.to_string(),
            column: c.to_string(),
            count: *n,
        })
        .collect()
}

pub fn trend_rows(rows: &[(IsoWeekKey, usize)]) -> Vec<WeeklyTrendRow> {
    rows.iter()
        .map(|(w, n)| WeeklyTrendRow {
            week: w.to_string(),
            completed: *n,
        })
        .collect()
}
