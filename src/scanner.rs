// 🔭 Ledger Scanner
// Finds the structural anchors inside a free-form template sheet:
//   header row  → the cell holding the literal date-column marker
//   blank row   → first row below it with all five tracked columns empty
// and reads the already-transcribed rows back as identity keys.
//
// Rows in [header_row + 1, first_blank_row) are read-only to the merge.

use crate::config::ScanBounds;
use crate::dates::resolve_date;
use crate::error::MergeError;
use crate::grid::Grid;
use crate::record::IdentityKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

// ============================================================================
// FIXED COLUMN LAYOUT
// ============================================================================

pub const COL_DATE: u32 = 1;
pub const COL_DESTINATION: u32 = 2;
pub const COL_MODE: u32 = 3;
pub const COL_ROUTE: u32 = 4;
pub const COL_AMOUNT: u32 = 5;

/// Columns cleared on every written row
pub const CLEARED_COLUMNS: [u32; 2] = [6, 7];

// ============================================================================
// LEDGER REGION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRegion {
    pub header_row: u32,
    pub first_blank_row: u32,
}

impl LedgerRegion {
    pub fn first_data_row(&self) -> u32 {
        self.header_row + 1
    }

    /// Last already-written row, if the region has any
    pub fn last_existing_row(&self) -> Option<u32> {
        let last = self.first_blank_row.checked_sub(1)?;
        (last >= self.first_data_row()).then_some(last)
    }

    pub fn existing_rows(&self) -> std::ops::Range<u32> {
        self.first_data_row()..self.first_blank_row
    }
}

// ============================================================================
// LEDGER SCANNER
// ============================================================================

pub struct LedgerScanner {
    pub header_marker: String,
    pub bounds: ScanBounds,
}

impl LedgerScanner {
    pub fn new(header_marker: impl Into<String>, bounds: ScanBounds) -> Self {
        LedgerScanner {
            header_marker: header_marker.into(),
            bounds,
        }
    }

    /// Locate header + first blank row. Missing header is fatal.
    pub fn locate<G: Grid + ?Sized>(&self, grid: &G) -> Result<LedgerRegion, MergeError> {
        let header_row = self
            .find_header_row(grid)
            .ok_or_else(|| MergeError::HeaderNotFound {
                marker: self.header_marker.clone(),
                max_row: self.bounds.header_rows,
                max_col: self.bounds.header_cols,
            })?;

        let first_blank_row = self.find_first_blank_row(grid, header_row + 1);
        debug!(header_row, first_blank_row, "ledger region located");

        Ok(LedgerRegion {
            header_row,
            first_blank_row,
        })
    }

    /// Row of the first cell (row-major) whose text equals the marker exactly
    pub fn find_header_row<G: Grid + ?Sized>(&self, grid: &G) -> Option<u32> {
        (1..=self.bounds.header_rows).find(|&row| {
            (1..=self.bounds.header_cols)
                .any(|col| grid.value(row, col).as_text() == Some(self.header_marker.as_str()))
        })
    }

    /// First all-blank row in the data window; the row after the window if none
    pub fn find_first_blank_row<G: Grid + ?Sized>(&self, grid: &G, start_row: u32) -> u32 {
        self.window(start_row)
            .find(|&row| is_blank_row(grid, row))
            .unwrap_or(start_row + self.bounds.data_rows)
    }

    /// Identity keys of every dated row above the first blank row.
    /// Rows whose date column does not resolve are skipped, not a stop.
    pub fn collect_existing_keys<G: Grid + ?Sized>(&self, grid: &G, start_row: u32) -> HashSet<IdentityKey> {
        let mut keys = HashSet::new();
        let mut skipped = 0usize;

        for row in self.window(start_row) {
            if is_blank_row(grid, row) {
                break;
            }

            let Some(date) = resolve_date(grid.value(row, COL_DATE)) else {
                skipped += 1;
                continue;
            };

            keys.insert(IdentityKey::new(
                date,
                &grid.value(row, COL_DESTINATION).normalized_text(),
                &grid.value(row, COL_MODE).normalized_text(),
                &grid.value(row, COL_ROUTE).normalized_text(),
                grid.value(row, COL_AMOUNT).to_int(),
            ));
        }

        debug!(keys = keys.len(), skipped, "existing ledger keys collected");
        keys
    }

    /// Route text of the last existing row, if any
    pub fn last_route<G: Grid + ?Sized>(&self, grid: &G, region: &LedgerRegion) -> Option<String> {
        region
            .last_existing_row()
            .map(|row| grid.value(row, COL_ROUTE).to_string())
    }

    fn window(&self, start_row: u32) -> std::ops::Range<u32> {
        start_row..start_row + self.bounds.data_rows
    }
}

pub fn is_blank_row<G: Grid + ?Sized>(grid: &G, row: u32) -> bool {
    (COL_DATE..=COL_AMOUNT).all(|col| grid.value(row, col).is_empty())
}

// ============================================================================
// TESTS
// ============================================================================
