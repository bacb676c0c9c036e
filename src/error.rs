// 🚫 Fatal run conditions
// Anything in here stops the run before the ledger is touched.
// Row-level anomalies are NOT errors; they are counted in the report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    /// Source bytes did not decode under any attempted encoding
    #[error("source feed could not be decoded (tried {tried})")]
    Decode { tried: String },

    /// One or more logical columns had no matching header
    #[error("source feed is missing required columns {missing:?}; present: {present:?}")]
    MissingColumns {
        missing: Vec<String>,
        present: Vec<String>,
    },

    /// Header marker not found inside the bounded scan window
    #[error("header marker '{marker}' not found within rows 1..={max_row}, columns 1..={max_col}")]
    HeaderNotFound {
        marker: String,
        max_row: u32,
        max_col: u32,
    },

    #[error("name cell {cell} is empty")]
    EmptyName { cell: String },

    #[error("closing date cell {cell} does not resolve to a date (found '{found}')")]
    ClosingDate { cell: String, found: String },

    #[error("sheet '{name}' not found; available: {available:?}")]
    SheetNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid cell address '{0}'")]
    InvalidCellAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_headers() {
        let err = MergeError::MissingColumns {
            missing: vec!["amount".to_string()],
            present: vec!["日付".to_string(), "内容".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("amount"));
        assert!(msg.contains("内容"));
    }

    #[test]
    fn test_header_not_found_message_has_bounds() {
        let err = MergeError::HeaderNotFound {
            marker: "日付".to_string(),
            max_row: 120,
            max_col: 40,
        };
        assert_eq!(
            err.to_string(),
            "header marker '日付' not found within rows 1..=120, columns 1..=40"
        );
    }
}
