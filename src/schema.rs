use crate::error::SchemaError;
use crate::types::{Column, RawBatch, REQUIRED_COLUMNS};

/// Check that every required column exists in the header row.
///
/// Only the header is inspected: a column that is present but empty in
/// every row still passes. On success the batch is handed back unchanged.
pub fn validate(batch: RawBatch, required: &[Column]) -> Result<RawBatch, SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !batch.has_column(**c))
        .map(|c| c.header().to_string())
        .collect();
    if missing.is_empty() {
        Ok(batch)
    } else {
        Err(SchemaError { missing })
    }
}

pub fn validate_required(batch: RawBatch) -> Result<RawBatch, SchemaError> {
    validate(batch, &REQUIRED_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(headers: &[&str], rows: Vec<Vec<&str>>) -> RawBatch {
        RawBatch {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }

    #[test]
    fn passes_when_all_present() {
        let b = batch(&["Name", "Start Date", "Due Date", "Assignee"], vec![vec!["a", "", "", "x"]]);
        let out = validate_required(b.clone()).unwrap();
        assert_eq!(out, b);
    }

    #[test]
    fn empty_column_still_passes() {
        let b = batch(&["Name", "Start Date", "Due Date"], vec![vec!["a", "", ""], vec!["b", "", ""]]);
        assert!(validate_required(b).is_ok());
    }

    #[test]
    fn names_every_missing_column() {
        let b = batch(&["Name", "Assignee"], vec![]);
        let err = validate_required(b).unwrap_err();
        assert_eq!(err.missing, vec!["Start Date".to_string(), "Due Date".to_string()]);
        assert_eq!(err.to_string(), "missing required columns: Start Date, Due Date");
    }
}
