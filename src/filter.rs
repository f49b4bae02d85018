use crate::loader::content_id;
use crate::types::{Column, Task, TaskBatch};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

pub const DEFAULT_SEED: u64 = 42;

/// Set-membership constraint on one categorical field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(values.into_iter().map(Into::into).collect())
    }

    /// A null value never passes a restrictive selection.
    pub fn admits(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => value.is_some_and(|v| set.contains(v)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

/// Inclusive window: a task fits when it starts on or after `start` and is
/// due on or before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// The `days` days ending on `today`; `None` past the calendar's range.
    pub fn last_days(today: NaiveDate, days: u32) -> Option<Self> {
        let start = today.checked_sub_days(Days::new(u64::from(days)))?;
        Some(DateRange::new(start, today))
    }

    /// The `days` days starting on `today`; `None` past the calendar's range.
    pub fn next_days(today: NaiveDate, days: u32) -> Option<Self> {
        let end = today.checked_add_days(Days::new(u64::from(days)))?;
        Some(DateRange::new(today, end))
    }

    /// First to last day of the calendar month after `today`.
    pub fn next_month(today: NaiveDate) -> Option<Self> {
        let start = today.with_day(1)?.checked_add_months(Months::new(1))?;
        let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
        Some(DateRange::new(start, end))
    }

    pub fn contains(&self, task: &Task) -> bool {
        match (task.start_date, task.due_date) {
            (Some(s), Some(d)) => s >= self.start && d <= self.end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    pub assignees: Selection,
    pub projects: Selection,
    /// Matched against `Deliverable Status`.
    pub statuses: Selection,
    pub sample_limit: Option<usize>,
    pub seed: u64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec {
            date_range: None,
            assignees: Selection::All,
            projects: Selection::All,
            statuses: Selection::All,
            sample_limit: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl FilterSpec {
    pub fn is_unrestricted(&self) -> bool {
        self.date_range.is_none()
            && self.assignees.is_all()
            && self.projects.is_all()
            && self.statuses.is_all()
            && self.sample_limit.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub batch: TaskBatch,
    /// Tasks that satisfied the predicate, before any sampling.
    pub matched: usize,
    pub sampled: bool,
}

/// Conjunction of every constraint in `spec`. A selection on a column the
/// batch does not have is treated as passing.
pub fn matches(task: &Task, spec: &FilterSpec, columns: &BTreeSet<Column>) -> bool {
    let applies = |col: Column, sel: &Selection, value: Option<&str>| {
        !columns.contains(&col) || sel.admits(value)
    };
    spec.date_range.map_or(true, |r| r.contains(task))
        && applies(Column::Assignee, &spec.assignees, task.assignee.as_deref())
        && applies(Column::Projects, &spec.projects, task.project.as_deref())
        && applies(
            Column::DeliverableStatus,
            &spec.statuses,
            task.deliverable_status.as_deref(),
        )
}

fn sample_rank(seed: u64, row: usize) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(seed.to_le_bytes());
    h.update((row as u64).to_le_bytes());
    h.finalize().into()
}

/// Keep the `limit` tasks with the lowest seeded rank, in their original
/// order. Ranks depend on the source row, so a sample re-sampled with the
/// same seed is unchanged.
fn sample(tasks: Vec<Task>, limit: usize, seed: u64) -> Vec<Task> {
    let mut ranked: Vec<([u8; 32], usize)> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (sample_rank(seed, t.row), i))
        .collect();
    ranked.sort_unstable();
    let keep: HashSet<usize> = ranked.into_iter().take(limit).map(|(_, i)| i).collect();
    tasks
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, t)| t)
        .collect()
}

pub fn apply(batch: &TaskBatch, spec: &FilterSpec) -> Filtered {
    let tasks: Vec<Task> = batch
        .tasks
        .iter()
        .filter(|t| matches(t, spec, &batch.columns))
        .cloned()
        .collect();
    let matched = tasks.len();

    let (tasks, sampled) = match spec.sample_limit {
        Some(limit) if matched > limit => {
            debug!(matched, limit, seed = spec.seed, "sampling filtered tasks");
            (sample(tasks, limit, spec.seed), true)
        }
        _ => (tasks, false),
    };

    let id = if spec.is_unrestricted() {
        batch.id.clone()
    } else {
        content_id(format!("{}|{:?}", batch.id, spec).as_bytes())
    };
    debug!(total = batch.len(), matched, kept = tasks.len(), "applied filter");

    Filtered {
        batch: TaskBatch {
            id,
            columns: batch.columns.clone(),
            tasks,
        },
        matched,
        sampled,
    }
}

/// Distinct non-null values offered for each filterable column, in the
/// order they first appear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub assignees: Vec<String>,
    pub projects: Vec<String>,
    pub statuses: Vec<String>,
}

impl FilterOptions {
    /// Spec with every offered value selected.
    pub fn select_all(&self) -> FilterSpec {
        FilterSpec {
            assignees: Selection::only(self.assignees.iter().cloned()),
            projects: Selection::only(self.projects.iter().cloned()),
            statuses: Selection::only(self.statuses.iter().cloned()),
            ..FilterSpec::default()
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .flatten()
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

pub fn filter_options(batch: &TaskBatch) -> FilterOptions {
    FilterOptions {
        assignees: distinct(batch.tasks.iter().map(|t| t.assignee.as_deref())),
        projects: distinct(batch.tasks.iter().map(|t| t.project.as_deref())),
        statuses: distinct(batch.tasks.iter().map(|t| t.deliverable_status.as_deref())),
    }
}
