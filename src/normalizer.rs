// 🔄 Record Normalizer
// Raw export row → canonical Record, then a stable (date, route) sort.
// The sorted order IS the write order, so it decides continuity adjacency.

use crate::classifier::DestinationClassifier;
use crate::dates::resolve_date;
use crate::record::Record;
use crate::source::SourceRow;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rows dropped during normalization (no resolvable date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardedRow {
    pub line: usize,
    pub date: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub discarded: Vec<DiscardedRow>,
}

pub struct RecordNormalizer {
    classifier: DestinationClassifier,
    mode_label: String,
}

impl RecordNormalizer {
    pub fn new(home_keyword: &str, mode_label: &str) -> Self {
        RecordNormalizer {
            classifier: DestinationClassifier::new(home_keyword),
            mode_label: mode_label.to_string(),
        }
    }

    /// One row; None when the date cannot be resolved
    pub fn normalize(&self, row: &SourceRow) -> Option<Record> {
        let date = resolve_date(&row.date)?;
        let route = row.content.trim();
        let amount = row.amount.to_int().abs();
        let destination = self.classifier.classify(route);

        Some(Record::new(date, destination, &self.mode_label, route, amount, row.line))
    }

    /// All rows, sorted by (date, route); ties keep source order
    pub fn normalize_all(&self, rows: &[SourceRow]) -> Normalized {
        let mut out = Normalized::default();

        for row in rows {
            match self.normalize(row) {
                Some(record) => out.records.push(record),
                None => {
                    debug!(line = row.line, date = %row.date, "source row discarded: no date");
                    out.discarded.push(DiscardedRow {
                        line: row.line,
                        date: row.date.to_string(),
                        content: row.content.clone(),
                    });
                }
            }
        }

        // sort_by is stable
        out.records
            .sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.route().cmp(b.route())));
        out
    }
}
