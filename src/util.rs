// Utility helpers for parsing and basic statistics.
//
// All of the forgiving cell handling lives here so the pipeline stages can
// work with typed values. Every parser distinguishes a blank cell from one
// that held text it could not understand, so callers can count recoveries.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Outcome of parsing a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<T> {
    Blank,
    Parsed(T),
    Invalid,
}

impl<T> Cell<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Cell::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Cell::Invalid)
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a date in any of the layouts task-tracker exports commonly use.
/// Datetimes are accepted and truncated to the calendar date.
pub fn parse_date_safe(s: Option<&str>) -> Cell<NaiveDate> {
    let Some(s) = s.map(str::trim).filter(|s| !s.is_empty()) else {
        return Cell::Blank;
    };
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Cell::Parsed(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Cell::Parsed(dt.date());
        }
    }
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Cell::Parsed(dt.date_naive()),
        Err(_) => Cell::Invalid,
    }
}

/// Parse a non-negative quantity such as an hour count.
///
/// - Trims whitespace and strips thousands separators like `","`.
/// - Negative and non-finite values are rejected.
pub fn parse_f64_safe(s: Option<&str>) -> Cell<f64> {
    let Some(s) = s.map(str::trim).filter(|s| !s.is_empty()) else {
        return Cell::Blank;
    };
    match s.replace(',', "").parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Cell::Parsed(v),
        _ => Cell::Invalid,
    }
}

pub fn parse_bool_safe(s: Option<&str>) -> Cell<bool> {
    let Some(s) = s.map(str::trim).filter(|s| !s.is_empty()) else {
        return Cell::Blank;
    };
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Cell::Parsed(true),
        "false" | "no" | "n" | "0" => Cell::Parsed(false),
        _ => Cell::Invalid,
    }
}

/// Trimmed text, with empty cells mapped to `None`.
pub fn clean_text(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn days_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Share of `part` in `whole` as a percentage; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.50`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
