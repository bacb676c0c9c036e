// ⚙️ Merge configuration - constants as data
// Every literal the merge depends on lives here, loadable from a JSON file.

use crate::classifier::DestinationLabels;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// SOURCE COLUMN SYNONYMS
// ============================================================================

/// Acceptable header names per logical column, tried in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSynonyms {
    pub date: Vec<String>,
    pub content: Vec<String>,
    pub amount: Vec<String>,
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        ColumnSynonyms {
            date: owned(&["日付", "利用日", "日時", "日"]),
            content: owned(&["内容", "経路", "明細", "区間"]),
            amount: owned(&["金額", "運賃", "金額(円)", "利用金額", "支払金額"]),
        }
    }
}

// ============================================================================
// SCAN BOUNDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanBounds {
    /// Header search: rows 1..=header_rows
    pub header_rows: u32,

    /// Header search: columns 1..=header_cols
    /// Inclusive: column 40 is scanned, where a half-open 1..40 would stop at 39
    pub header_cols: u32,

    /// Data window below the header
    pub data_rows: u32,
}

impl Default for ScanBounds {
    fn default() -> Self {
        ScanBounds {
            header_rows: 120,
            header_cols: 40,
            data_rows: 3000,
        }
    }
}

// ============================================================================
// TEMPLATE CELLS
// ============================================================================

/// A1-style addresses of the template metadata cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateCells {
    pub name: String,
    pub home_station: String,
    pub closing_date: String,
}

impl Default for TemplateCells {
    fn default() -> Self {
        TemplateCells {
            name: "B4".to_string(),
            home_station: "B5".to_string(),
            closing_date: "G1".to_string(),
        }
    }
}

// ============================================================================
// MERGE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Target worksheet in the ledger workbook
    pub sheet: String,

    pub cells: TemplateCells,

    /// Literal value of the date column header
    pub header_marker: String,

    /// Constant travel-mode label
    pub mode_label: String,

    pub labels: DestinationLabels,

    /// Organisation marker in the output file name
    pub organization: String,

    pub columns: ColumnSynonyms,

    pub bounds: ScanBounds,

    /// Number format applied to written date cells
    pub date_format: String,

    /// RGB fill for continuity breaks
    pub alert_fill: u32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            sheet: "【12月】交通費".to_string(),
            cells: TemplateCells::default(),
            header_marker: "日付".to_string(),
            mode_label: "電車".to_string(),
            labels: DestinationLabels::default(),
            organization: "JACOM".to_string(),
            columns: ColumnSynonyms::default(),
            bounds: ScanBounds::default(),
            date_format: "m\"月\"d\"日\"".to_string(),
            alert_fill: 0xFFC7CE,
        }
    }
}

impl MergeConfig {
    /// Load from a JSON file; missing fields fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        MergeConfig::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse merge config JSON")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.header_marker, "日付");
        assert_eq!(config.mode_label, "電車");
        assert_eq!(config.cells.closing_date, "G1");
        assert_eq!(config.bounds.data_rows, 3000);
        assert_eq!((config.bounds.header_rows, config.bounds.header_cols), (120, 40));
        assert_eq!(config.columns.amount[2], "金額(円)");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MergeConfig::from_json(
            r#"{ "sheet": "【1月】交通費", "cells": { "closing_date": "H2" }, "bounds": { "data_rows": 500 } }"#,
        )
        .unwrap();

        assert_eq!(config.sheet, "【1月】交通費");
        assert_eq!(config.cells.closing_date, "H2");
        assert_eq!(config.cells.name, "B4");
        assert_eq!(config.bounds.data_rows, 500);
        assert_eq!(config.bounds.header_rows, 120);
        assert_eq!(config.organization, "JACOM");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "organization": "ACME", "mode_label": "バス" }}"#).unwrap();

        let config = MergeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.organization, "ACME");
        assert_eq!(config.mode_label, "バス");
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(MergeConfig::from_json("{ not json").is_err());
    }
}
