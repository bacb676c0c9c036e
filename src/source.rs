// 📥 Source feed - decoded tabular export
//
// Reads the periodic fare export (CSV, UTF-8 or CP932) and hands the core
// plain rows with three semantic columns resolved by header synonyms.

use crate::config::ColumnSynonyms;
use crate::error::MergeError;
use crate::value::CellValue;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceRow - one raw export row before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Line in the original file (header = line 1)
    pub line: usize,
    pub date: CellValue,
    pub content: String,
    pub amount: CellValue,
}

impl SourceRow {
    pub fn new(line: usize, date: impl Into<CellValue>, content: &str, amount: impl Into<CellValue>) -> Self {
        SourceRow {
            line,
            date: date.into(),
            content: content.to_string(),
            amount: amount.into(),
        }
    }
}

/// Header (and its position) that satisfied a logical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    pub header: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: ResolvedColumn,
    pub content: ResolvedColumn,
    pub amount: ResolvedColumn,
}

/// Decoded feed: rows plus provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFeed {
    pub rows: Vec<SourceRow>,
    pub mapping: ColumnMapping,
    pub encoding: String,
    /// SHA-256 of the raw bytes
    pub fingerprint: String,
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// RecordSource - anything that can produce source rows for a merge
pub trait RecordSource {
    fn read_feed(&self, columns: &ColumnSynonyms) -> Result<SourceFeed>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// CSV export on disk
pub struct CsvExport {
    path: PathBuf,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvExport { path: path.into() }
    }
}

impl RecordSource for CsvExport {
    fn read_feed(&self, columns: &ColumnSynonyms) -> Result<SourceFeed> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to open source file: {}", self.describe()))?;

        let feed = parse_csv_bytes(&bytes, columns)?;
        info!(
            source = %self.describe(),
            encoding = %feed.encoding,
            rows = feed.rows.len(),
            "source feed decoded"
        );
        Ok(feed)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Decode raw bytes: UTF-8 (BOM optional) first, then CP932.
pub fn decode_text(bytes: &[u8]) -> Result<(String, &'static str), MergeError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return Ok((text.to_string(), "utf-8"));
    }

    // encoding_rs' Shift_JIS is the WHATWG flavour, i.e. CP932
    if let Some(text) = encoding_rs::SHIFT_JIS.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok((text.into_owned(), "cp932"));
    }

    Err(MergeError::Decode {
        tried: "utf-8-sig, cp932".to_string(),
    })
}

/// Decode and parse a CSV export, resolving the three logical columns.
pub fn parse_csv_bytes(bytes: &[u8], columns: &ColumnSynonyms) -> Result<SourceFeed> {
    let (text, encoding) = decode_text(bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mapping = resolve_columns(&headers, columns)?;
    debug!(
        date = %mapping.date.header,
        content = %mapping.content.header,
        amount = %mapping.amount.header,
        "source columns resolved"
    );

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.with_context(|| format!("Failed to parse CSV line {}", line))?;

        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        let as_cell = |s: String| if s.is_empty() { CellValue::Empty } else { CellValue::Text(s) };

        rows.push(SourceRow {
            line,
            date: as_cell(field(mapping.date.index)),
            content: field(mapping.content.index),
            amount: as_cell(field(mapping.amount.index)),
        });
    }

    let mut hasher = Sha256::new();
    hasher.update(bytes);

    Ok(SourceFeed {
        rows,
        mapping,
        encoding: encoding.to_string(),
        fingerprint: format!("{:x}", hasher.finalize()),
    })
}

/// First synonym present in the headers, per logical column.
pub fn resolve_columns(headers: &[String], columns: &ColumnSynonyms) -> Result<ColumnMapping, MergeError> {
    let find = |candidates: &[String]| {
        candidates.iter().find_map(|c| {
            headers
                .iter()
                .position(|h| h == c)
                .map(|index| ResolvedColumn { header: c.clone(), index })
        })
    };

    let date = find(&columns.date);
    let content = find(&columns.content);
    let amount = find(&columns.amount);

    match (date, content, amount) {
        (Some(date), Some(content), Some(amount)) => Ok(ColumnMapping { date, content, amount }),
        (date, content, amount) => {
            let missing = [("date", date), ("content", content), ("amount", amount)]
                .into_iter()
                .filter(|(_, found)| found.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            Err(MergeError::MissingColumns {
                missing,
                present: headers.to_vec(),
            })
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
