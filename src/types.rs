use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// Every CSV column the pipeline knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Name,
    StartDate,
    DueDate,
    CreatedAt,
    CompletedAt,
    LastModified,
    Assignee,
    Projects,
    DeliverableStatus,
    EstimatedHours,
    HarvestHours,
    NumberOfDelays,
    Overdue,
    JobCategory,
    Billable,
    DelayRationale,
    TaskId,
}

pub const REQUIRED_COLUMNS: [Column; 3] = [Column::Name, Column::StartDate, Column::DueDate];

pub const DATE_COLUMNS: [Column; 5] = [
    Column::StartDate,
    Column::DueDate,
    Column::CreatedAt,
    Column::CompletedAt,
    Column::LastModified,
];

pub const NUMERIC_COLUMNS: [Column; 3] = [
    Column::EstimatedHours,
    Column::HarvestHours,
    Column::NumberOfDelays,
];

static BY_HEADER: Lazy<HashMap<&'static str, Column>> =
    Lazy::new(|| Column::ALL.iter().map(|c| (c.header(), *c)).collect());

impl Column {
    pub const ALL: [Column; 17] = [
        Column::Name,
        Column::StartDate,
        Column::DueDate,
        Column::CreatedAt,
        Column::CompletedAt,
        Column::LastModified,
        Column::Assignee,
        Column::Projects,
        Column::DeliverableStatus,
        Column::EstimatedHours,
        Column::HarvestHours,
        Column::NumberOfDelays,
        Column::Overdue,
        Column::JobCategory,
        Column::Billable,
        Column::DelayRationale,
        Column::TaskId,
    ];

    /// Header text as it appears in the uploaded file.
    pub fn header(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::StartDate => "Start Date",
            Column::DueDate => "Due Date",
            Column::CreatedAt => "Created At",
            Column::CompletedAt => "Completed At",
            Column::LastModified => "Last Modified",
            Column::Assignee => "Assignee",
            Column::Projects => "Projects",
            Column::DeliverableStatus => "Deliverable Status",
            Column::EstimatedHours => "Estimated Hours",
            Column::HarvestHours => "Harvest Hours",
            Column::NumberOfDelays => "Number of Delays",
            Column::Overdue => "Overdue",
            Column::JobCategory => "Job Category",
            Column::Billable => "Billable or Non-Billable",
            Column::DelayRationale => "Delay Rationale",
            Column::TaskId => "Task ID",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        BY_HEADER.get(header.trim()).copied()
    }

    pub fn is_date(self) -> bool {
        DATE_COLUMNS.contains(&self)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Undecoded rows exactly as read from the CSV file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawBatch {
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.column_index(column.header()).is_some()
    }

    /// Cell lookup; short (ragged) rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parsed date-valued fields of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFields {
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub last_modified: Option<NaiveDate>,
}

impl DateFields {
    pub fn get(&self, column: Column) -> Option<NaiveDate> {
        match column {
            Column::StartDate => self.start_date,
            Column::DueDate => self.due_date,
            Column::CreatedAt => self.created_at,
            Column::CompletedAt => self.completed_at,
            Column::LastModified => self.last_modified,
            _ => None,
        }
    }

    pub fn set(&mut self, column: Column, value: Option<NaiveDate>) {
        match column {
            Column::StartDate => self.start_date = value,
            Column::DueDate => self.due_date = value,
            Column::CreatedAt => self.created_at = value,
            Column::CompletedAt => self.completed_at = value,
            Column::LastModified => self.last_modified = value,
            _ => {}
        }
    }
}

/// A row after date coercion. Every non-date column is still raw text,
/// keyed by its header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    /// Zero-based position of the row in the uploaded file.
    pub row: usize,
    pub dates: DateFields,
    pub values: BTreeMap<String, String>,
}

impl NormalizedRecord {
    pub fn value(&self, column: Column) -> Option<&str> {
        self.values.get(column.header()).map(String::as_str)
    }
}

/// Counts of cell values that could not be parsed and were replaced by
/// null (dates, booleans) or 0 (numbers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseWarnings {
    pub dates: usize,
    pub numbers: usize,
    pub booleans: usize,
    pub by_column: BTreeMap<String, usize>,
}

impl ParseWarnings {
    pub fn record(&mut self, column: Column) {
        if column.is_date() {
            self.dates += 1;
        } else if column == Column::Overdue {
            self.booleans += 1;
        } else {
            self.numbers += 1;
        }
        *self.by_column.entry(column.header().to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &ParseWarnings) {
        self.dates += other.dates;
        self.numbers += other.numbers;
        self.booleans += other.booleans;
        for (col, n) in &other.by_column {
            *self.by_column.entry(col.clone()).or_insert(0) += n;
        }
    }

    pub fn total(&self) -> usize {
        self.dates + self.numbers + self.booleans
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub headers: Vec<String>,
    pub records: Vec<NormalizedRecord>,
    pub warnings: ParseWarnings,
}

impl NormalizedBatch {
    pub fn has_column(&self, column: Column) -> bool {
        self.headers.iter().any(|h| h == column.header())
    }

    /// Rebuild raw text rows, dates rendered as `YYYY-MM-DD`.
    pub fn to_raw(&self) -> RawBatch {
        let rows = self
            .records
            .iter()
            .map(|rec| {
                self.headers
                    .iter()
                    .map(|h| match Column::from_header(h).filter(|c| c.is_date()) {
                        Some(c) => rec
                            .dates
                            .get(c)
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default(),
                        None => rec.values.get(h).cloned().unwrap_or_default(),
                    })
                    .collect()
            })
            .collect();
        RawBatch { headers: self.headers.clone(), rows }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CompletionStatus {
    Completed,
    Overdue,
    InProgress,
}

impl CompletionStatus {
    pub const ALL: [CompletionStatus; 3] = [
        CompletionStatus::Completed,
        CompletionStatus::Overdue,
        CompletionStatus::InProgress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Completed => "Completed",
            CompletionStatus::Overdue => "Overdue",
            CompletionStatus::InProgress => "In Progress",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully derived task. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub row: usize,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub last_modified: Option<NaiveDate>,
    pub assignee: Option<String>,
    pub project: Option<String>,
    pub deliverable_status: Option<String>,
    pub job_category: Option<String>,
    pub billable_flag: Option<String>,
    pub delay_rationale: Option<String>,
    pub task_id: Option<String>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub number_of_delays: f64,
    pub overdue: Option<bool>,
    pub duration_days: Option<i64>,
    pub completion_status: CompletionStatus,
    /// Columns the pipeline does not recognize, passed through verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Task {
    pub fn category(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Name => Some(self.name.as_str()),
            Dimension::Assignee => self.assignee.as_deref(),
            Dimension::Project => self.project.as_deref(),
            Dimension::DeliverableStatus => self.deliverable_status.as_deref(),
            Dimension::JobCategory => self.job_category.as_deref(),
            Dimension::Billable => self.billable_flag.as_deref(),
            Dimension::DelayRationale => self.delay_rationale.as_deref(),
            Dimension::TaskId => self.task_id.as_deref(),
            Dimension::Overdue => self.overdue.map(|o| if o { "true" } else { "false" }),
            Dimension::CompletionStatus => Some(self.completion_status.as_str()),
        }
    }

    /// `None` only for a task whose duration is undefined.
    pub fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::EstimatedHours => Some(self.estimated_hours),
            Measure::ActualHours => Some(self.actual_hours),
            Measure::NumberOfDelays => Some(self.number_of_delays),
            Measure::Duration => self.duration_days.map(|d| d as f64),
        }
    }
}

/// Content hash identifying a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BatchId(pub String);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskBatch {
    pub id: BatchId,
    /// Recognized columns present in the source file.
    pub columns: BTreeSet<Column>,
    pub tasks: Vec<Task>,
}

impl TaskBatch {
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Categorical fields usable as grouping keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Name,
    Assignee,
    Project,
    DeliverableStatus,
    JobCategory,
    Billable,
    DelayRationale,
    TaskId,
    Overdue,
    CompletionStatus,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Name => Column::Name.header(),
            Dimension::Assignee => Column::Assignee.header(),
            Dimension::Project => Column::Projects.header(),
            Dimension::DeliverableStatus => Column::DeliverableStatus.header(),
            Dimension::JobCategory => Column::JobCategory.header(),
            Dimension::Billable => Column::Billable.header(),
            Dimension::DelayRationale => Column::DelayRationale.header(),
            Dimension::TaskId => Column::TaskId.header(),
            Dimension::Overdue => Column::Overdue.header(),
            Dimension::CompletionStatus => "Completion Status",
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "Completion Status" || s == "Completion_Status" {
            return Ok(Dimension::CompletionStatus);
        }
        match Column::from_header(s) {
            Some(Column::Name) => Ok(Dimension::Name),
            Some(Column::Assignee) => Ok(Dimension::Assignee),
            Some(Column::Projects) => Ok(Dimension::Project),
            Some(Column::DeliverableStatus) => Ok(Dimension::DeliverableStatus),
            Some(Column::JobCategory) => Ok(Dimension::JobCategory),
            Some(Column::Billable) => Ok(Dimension::Billable),
            Some(Column::DelayRationale) => Ok(Dimension::DelayRationale),
            Some(Column::TaskId) => Ok(Dimension::TaskId),
            Some(Column::Overdue) => Ok(Dimension::Overdue),
            _ => Err(s.to_string()),
        }
    }
}

/// Numeric fields usable in sums and means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    EstimatedHours,
    ActualHours,
    NumberOfDelays,
    Duration,
}

impl Measure {
    pub fn label(self) -> &'static str {
        match self {
            Measure::EstimatedHours => Column::EstimatedHours.header(),
            Measure::ActualHours => Column::HarvestHours.header(),
            Measure::NumberOfDelays => Column::NumberOfDelays.header(),
            Measure::Duration => "Duration",
        }
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "Duration" {
            return Ok(Measure::Duration);
        }
        match Column::from_header(s) {
            Some(Column::EstimatedHours) => Ok(Measure::EstimatedHours),
            Some(Column::HarvestHours) => Ok(Measure::ActualHours),
            Some(Column::NumberOfDelays) => Ok(Measure::NumberOfDelays),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupValueRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupCountRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CrossTabRow {
    #[serde(rename = "Row")]
    #[tabled(rename = "Row")]
    pub row: String,
    #[serde(rename = "Column")]
    #[tabled(rename = "Column")]
    pub column: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WeeklyTrendRow {
    #[serde(rename = "Week")]
    #[tabled(rename = "Week")]
    pub week: String,
    #[serde(rename = "Completed")]
    #[tabled(rename = "Completed")]
    pub completed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub overdue: usize,
    pub in_progress: usize,
}

impl StatusCounts {
    pub fn get(&self, status: CompletionStatus) -> usize {
        match status {
            CompletionStatus::Completed => self.completed,
            CompletionStatus::Overdue => self.overdue,
            CompletionStatus::InProgress => self.in_progress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_tasks: usize,
    pub by_status: StatusCounts,
    pub total_estimated_hours: f64,
    pub total_actual_hours: f64,
    pub completed_tasks: usize,
    pub completed_pct: f64,
    pub overdue_flagged: usize,
    pub distinct_assignees: usize,
    pub project_start: Option<NaiveDate>,
    pub project_end: Option<NaiveDate>,
}
