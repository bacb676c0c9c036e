// 🧱 Cell values - the shared currency between source feed and ledger grid
//
// Both sides of a merge (export rows and existing ledger rows) are reduced
// through the same text and integer rules, otherwise identity keys drift.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CELL VALUE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Empty cell, or a text cell holding the empty string
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Trimmed display form used for every text field of an identity key
    pub fn normalized_text(&self) -> String {
        self.to_string().trim().to_string()
    }

    /// Integer form used for every numeric field of an identity key
    pub fn to_int(&self) -> i64 {
        match self {
            CellValue::Number(n) => truncate(*n),
            CellValue::Text(s) => coerce_int(s),
            CellValue::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

// ============================================================================
// INTEGER COERCION
// ============================================================================

fn truncate(n: f64) -> i64 {
    if n.is_finite() {
        n.trunc() as i64
    } else {
        0
    }
}

/// Parse free text as an amount, truncated toward zero.
///
/// Thousands separators and yen marks are dropped first ("1,200円" → 1200).
/// Anything that still fails to parse is 0.
pub fn coerce_int(raw: &str) -> i64 {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('円')
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return 0;
    }

    cleaned.parse::<f64>().map(truncate).unwrap_or(0)
}

// ============================================================================
// TESTS
// ============================================================================
