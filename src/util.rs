// Utility helpers for parsing and normalizing table cells.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// loaders and the aggregator can assume clean, typed values.
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Dash glyphs treated as equivalent in time-range labels.
const DASHES: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (spaces, grouping).
///
/// - Trims whitespace.
/// - Accepts exponent forms like `1.5e-3`.
/// - Accepts `","` only as a thousands separator (`1,234.5`); `1,5` is rejected.
/// - Returns `None` for anything that is not a finite number (`nan`, `n/a`, `inf`).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let v = if s.contains(',') {
        strip_thousands(s)?.parse::<f64>().ok()?
    } else {
        s.parse::<f64>().ok()?
    };
    v.is_finite().then_some(v)
}

/// `"-1,234,567.8"` -> `"-1234567.8"`; `None` unless every group after the
/// first has exactly three digits.
fn strip_thousands(s: &str) -> Option<String> {
    let (sign, body) = match s.strip_prefix(&['+', '-'][..]) {
        Some(rest) => (&s[..1], rest),
        None => ("", s),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let mut groups = int_part.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 || !first.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut out = format!("{}{}", sign, first);
    for g in groups {
        if g.len() != 3 || !g.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        out.push_str(g);
    }
    if let Some(frac) = frac_part {
        if frac.contains(',') {
            return None;
        }
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}

/// A cell is missing when it is absent, empty or whitespace only.
pub fn is_missing(s: Option<&str>) -> bool {
    s.map_or(true, |v| v.trim().is_empty())
}

/// Collapse dash variants to `-` and drop all whitespace, so
/// `"0:00 – 1:00"` and `"0:00-1:00"` give the same key.
pub fn normalize_time_range(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if DASHES.contains(&c) { '-' } else { c })
        .collect()
}

/// Headers like `0:00 - 1:00` carry both a colon and a dash.
pub fn looks_like_time_column(header: &str) -> bool {
    header.contains(':') && header.contains(&DASHES[..])
}

/// Leading hour of a time-range label: the text before the first colon.
pub fn parse_start_hour(label: &str) -> Option<i64> {
    let (head, _) = label.split_once(':')?;
    head.trim().parse::<i64>().ok()
}

/// `"Human Factors"` -> `"human_factors"`.
pub fn canonical_category(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Parse an event-log timestamp, reading ambiguous dates day-first.
///
/// Year-first ISO forms win when they match, as they cannot be ambiguous.
/// Date-only values land at midnight.
pub fn parse_timestamp_dayfirst(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%d-%m-%Y %H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d/%m/%Y %H:%M:%S%.f",
        "%d-%m-%Y %H:%M:%S%.f",
        "%d.%m.%Y %H:%M:%S%.f",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Display form used for timestamps in the output document. Sub-second
/// precision is kept, as microseconds, only when present.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Type an event-log cell for JSON: integers and floats become numbers,
/// missing cells become `null`, anything else stays text.
pub fn infer_cell_value(s: &str) -> Value {
    let t = s.trim();
    if t.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = t.parse::<i64>() {
        return Value::from(i);
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(s.to_string()),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 event rows`).
    n.to_formatted_string(&Locale::en)
}
