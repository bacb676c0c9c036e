// 📅 Date resolution
// One rule for every date we read: source rows, ledger rows, the closing-date cell.

use crate::value::CellValue;
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Numbers above this are treated as spreadsheet serial dates
const SERIAL_THRESHOLD: f64 = 30000.0;

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[/-](\d{1,2})[/-](\d{1,2})").expect("valid regex"));

static KANJI_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})年\s*(\d{1,2})月\s*(\d{1,2})日").expect("valid regex"));

static COMPACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid regex"));

/// Spreadsheet epoch (1900 date system, with the leap-year bug folded in)
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    serial_epoch().checked_add_signed(Duration::days(serial.trunc() as i64))
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - serial_epoch()).num_days() as f64
}

/// Resolve any cell-like value to a calendar date, or None.
pub fn resolve_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Number(n) if *n > SERIAL_THRESHOLD => serial_to_date(*n),
        CellValue::Text(s) => parse_date_text(s),
        _ => None,
    }
}

/// Tolerant text parser: "2024/4/1", "2024-04-01 10:22", "2024年4月1日", "20240401".
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for pattern in [&*NUMERIC_DATE, &*KANJI_DATE, &*COMPACT_DATE] {
        if let Some(caps) = pattern.captures(s) {
            return ymd(&caps[1], &caps[2], &caps[3]);
        }
    }

    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    let year = y.parse().ok()?;
    let month = m.parse().ok()?;
    let day = d.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
