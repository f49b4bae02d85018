use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows.
pub fn render_preview<T: Tabled + Clone>(rows: &[T], max_rows: usize) -> String {
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

/// Title, optional note line, then the Markdown preview.
pub fn preview_block<T: Tabled + Clone>(
    title: &str,
    note: Option<&str>,
    rows: &[T],
    max_rows: usize,
) -> String {
    let mut out = format!("{}\n", title);
    if let Some(n) = note {
        out.push_str(&format!("({})\n", n));
    }
    out.push('\n');
    out.push_str(&render_preview(rows, max_rows));
    out
}

pub fn preview_table<T: Tabled + Clone>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize) {
    println!("{}\n", preview_block(title, note, rows, max_rows));
}
