use crate::derive::derive;
use crate::error::Result;
use crate::normalize::normalize;
use crate::schema::validate_required;
use crate::types::{BatchId, ParseWarnings, RawBatch, TaskBatch};
use csv::{ByteRecord, ErrorKind, ReaderBuilder};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Rows holding invalid UTF-8, kept with the bad bytes replaced.
    pub lossy_rows: usize,
    /// Rows the CSV reader could not split at all.
    pub skipped_rows: usize,
    pub warnings: ParseWarnings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub lossy_rows: usize,
    pub skipped_rows: usize,
}

/// Hex SHA-256 of the uploaded bytes.
pub fn content_id(bytes: &[u8]) -> BatchId {
    BatchId(hex::encode(Sha256::digest(bytes)))
}

fn decode(record: &ByteRecord) -> (Vec<String>, bool) {
    let mut lossy = false;
    let cells = record
        .iter()
        .map(|field| match String::from_utf8_lossy(field) {
            Cow::Borrowed(s) => s.to_string(),
            Cow::Owned(s) => {
                lossy = true;
                s
            }
        })
        .collect();
    (cells, lossy)
}

/// Read a CSV with a header row into raw text cells. Ragged rows are
/// accepted; short rows read as blank in the missing cells. Invalid UTF-8
/// is replaced rather than rejected, and rows the reader cannot split are
/// skipped and counted.
pub fn read_raw<R: Read>(reader: R) -> Result<(RawBatch, ReadStats)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let (header_cells, _) = decode(rdr.byte_headers()?);
    let headers: Vec<String> = header_cells.iter().map(|h| h.trim().to_string()).collect();
    let mut stats = ReadStats::default();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.byte_records() {
        let record = match result {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable row");
                stats.skipped_rows += 1;
                continue;
            }
        };
        let (cells, lossy) = decode(&record);
        if lossy {
            stats.lossy_rows += 1;
        }
        rows.push(cells);
    }
    Ok((RawBatch { headers, rows }, stats))
}

/// Run validate → normalize → derive over one uploaded file's bytes.
pub fn load_bytes(bytes: &[u8]) -> Result<(TaskBatch, LoadReport)> {
    let (raw, stats) = read_raw(bytes)?;
    let raw = validate_required(raw)?;
    let total_rows = raw.len();
    let normalized = normalize(&raw);
    let (batch, derive_warnings) = derive(&normalized, content_id(bytes));

    let mut warnings = normalized.warnings.clone();
    warnings.merge(&derive_warnings);
    info!(rows = total_rows, batch = %batch.id, "loaded task snapshot");
    if stats.lossy_rows > 0 || stats.skipped_rows > 0 {
        warn!(
            lossy = stats.lossy_rows,
            skipped = stats.skipped_rows,
            "recovered undecodable rows"
        );
    }
    if warnings.total() > 0 {
        warn!(
            dates = warnings.dates,
            numbers = warnings.numbers,
            booleans = warnings.booleans,
            "recovered unparsable values"
        );
    }
    Ok((
        batch,
        LoadReport {
            total_rows,
            lossy_rows: stats.lossy_rows,
            skipped_rows: stats.skipped_rows,
            warnings,
        },
    ))
}

pub fn load_and_clean(path: impl AsRef<Path>) -> Result<(TaskBatch, LoadReport)> {
    let bytes = std::fs::read(path)?;
    load_bytes(&bytes)
}
