use crate::types::{Column, NormalizedBatch, NormalizedRecord, ParseWarnings, RawBatch, DATE_COLUMNS};
use crate::util::{parse_date_safe, Cell};
use std::collections::BTreeMap;

/// Coerce the known date columns of every row. Unparsable or missing
/// values become `None` and are counted, never raised. Every other column
/// is carried through as text.
pub fn normalize(raw: &RawBatch) -> NormalizedBatch {
    let date_cols: Vec<(Column, usize)> = DATE_COLUMNS
        .iter()
        .filter_map(|c| raw.column_index(c.header()).map(|i| (*c, i)))
        .collect();
    let mut warnings = ParseWarnings::default();

    let records = (0..raw.len())
        .map(|row| {
            let mut rec = NormalizedRecord {
                row,
                dates: Default::default(),
                values: BTreeMap::new(),
            };
            for &(col, idx) in &date_cols {
                let cell = parse_date_safe(Some(raw.cell(row, idx)));
                if cell.is_invalid() {
                    warnings.record(col);
                }
                rec.dates.set(col, cell.value());
            }
            for (idx, header) in raw.headers.iter().enumerate() {
                if date_cols.iter().any(|&(_, i)| i == idx) {
                    continue;
                }
                rec.values.insert(header.clone(), raw.cell(row, idx).to_string());
            }
            rec
        })
        .collect();

    NormalizedBatch {
        headers: raw.headers.clone(),
        records,
        warnings,
    }
}
