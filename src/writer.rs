// ✍️ Append Writer
// Writes net-new records strictly downward from the first blank row.
// Each row's continuity verdict is decided once, here, and only ever
// highlights that row's route cell.

use crate::classifier::DestinationLabels;
use crate::continuity::{ContinuityTracker, Verdict};
use crate::grid::Grid;
use crate::record::Record;
use crate::scanner::{
    LedgerRegion, CLEARED_COLUMNS, COL_AMOUNT, COL_DATE, COL_DESTINATION, COL_MODE, COL_ROUTE,
};
use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenRow {
    pub row: u32,
    pub source_line: usize,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppendSummary {
    pub rows: Vec<WrittenRow>,
}

impl AppendSummary {
    pub fn appended(&self) -> usize {
        self.rows.len()
    }

    pub fn flagged(&self) -> impl Iterator<Item = &WrittenRow> {
        self.rows.iter().filter(|r| r.verdict.is_break())
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged().count()
    }

    pub fn first_row(&self) -> Option<u32> {
        self.rows.first().map(|r| r.row)
    }

    pub fn last_row(&self) -> Option<u32> {
        self.rows.last().map(|r| r.row)
    }
}

pub struct AppendWriter<'a> {
    pub labels: &'a DestinationLabels,
    pub date_format: &'a str,
    pub alert_fill: u32,
}

impl<'a> AppendWriter<'a> {
    pub fn new(labels: &'a DestinationLabels, date_format: &'a str, alert_fill: u32) -> Self {
        AppendWriter {
            labels,
            date_format,
            alert_fill,
        }
    }

    /// Append `records` (already in write order) below the existing rows.
    pub fn append<G: Grid + ?Sized>(
        &self,
        grid: &mut G,
        region: &LedgerRegion,
        last_route: Option<&str>,
        records: &[Record],
    ) -> AppendSummary {
        let mut tracker = ContinuityTracker::seeded(last_route);
        let mut summary = AppendSummary::default();
        debug!(carried_exit = ?tracker.carried_exit(), "continuity seeded");

        for (offset, record) in records.iter().enumerate() {
            let row = region.first_blank_row + offset as u32;
            let verdict = tracker.advance(record.route());

            self.write_row(grid, row, record);

            if let Verdict::Break { carried_exit, entry } = &verdict {
                grid.set_fill(row, COL_ROUTE, self.alert_fill);
                info!(row, %carried_exit, %entry, "continuity break flagged");
            }

            summary.rows.push(WrittenRow {
                row,
                source_line: record.source_line(),
                verdict,
            });
        }

        summary
    }

    fn write_row<G: Grid + ?Sized>(&self, grid: &mut G, row: u32, record: &Record) {
        grid.set_value(row, COL_DATE, CellValue::Date(record.date()));
        grid.set_number_format(row, COL_DATE, self.date_format);

        grid.set_value(
            row,
            COL_DESTINATION,
            CellValue::text(self.labels.label(record.destination())),
        );
        grid.set_value(row, COL_MODE, CellValue::text(record.mode()));
        grid.set_value(row, COL_ROUTE, CellValue::text(record.route()));
        grid.set_value(row, COL_AMOUNT, CellValue::from(record.amount()));

        for col in CLEARED_COLUMNS {
            grid.set_value(row, col, CellValue::Empty);
        }
    }
}
