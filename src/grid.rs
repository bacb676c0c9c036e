// 🗂️ Ledger grid - cell access behind a trait
//
// The merge core only ever talks to `Grid`. `Sheet` is the in-memory
// implementation the xlsx loader fills and the xlsx writer drains.
// Coordinates are 1-based (row 1 / column 1 = A1).

use crate::error::MergeError;
use crate::value::CellValue;
use std::collections::BTreeMap;

static EMPTY_CELL: CellValue = CellValue::Empty;

// ============================================================================
// CELL ADDRESS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }

    /// Parse "B4", "$G$1", "aa10"
    pub fn parse(address: &str) -> Result<Self, MergeError> {
        let invalid = || MergeError::InvalidCellAddress(address.to_string());
        let cleaned: String = address.trim().chars().filter(|c| *c != '$').collect();

        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            let n = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(n))
                .ok_or_else(invalid)?;
        }

        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }

        Ok(CellRef { row, col })
    }
}

// ============================================================================
// GRID TRAIT
// ============================================================================

/// Cell access primitives the merge needs; nothing more
pub trait Grid {
    fn value(&self, row: u32, col: u32) -> &CellValue;

    fn set_value(&mut self, row: u32, col: u32, value: CellValue);

    fn number_format(&self, row: u32, col: u32) -> Option<&str>;

    fn set_number_format(&mut self, row: u32, col: u32, format: &str);

    /// RGB fill colour, if any
    fn fill(&self, row: u32, col: u32) -> Option<u32>;

    fn set_fill(&mut self, row: u32, col: u32, rgb: u32);

    fn value_at(&self, cell: CellRef) -> &CellValue {
        self.value(cell.row, cell.col)
    }
}

// ============================================================================
// IN-MEMORY SHEET
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub number_format: Option<String>,
    pub fill: Option<u32>,
    /// Formula source without the leading '='
    pub formula: Option<String>,
}

impl Cell {
    fn is_blank(&self) -> bool {
        self.value.is_empty()
            && self.number_format.is_none()
            && self.fill.is_none()
            && self.formula.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(u32, u32), Cell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.cells.entry((row, col)).or_default()
    }

    /// Non-blank cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.is_blank())
            .map(|(&(row, col), cell)| (CellRef::new(row, col), cell))
    }

    pub fn set_formula(&mut self, row: u32, col: u32, formula: impl Into<String>) {
        self.cell_mut(row, col).formula = Some(formula.into());
    }

    /// Last row holding any non-blank cell
    pub fn max_row(&self) -> u32 {
        self.cells().map(|(r, _)| r.row).max().unwrap_or(0)
    }
}

impl Grid for Sheet {
    fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cells
            .get(&(row, col))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY_CELL)
    }

    fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        let cell = self.cell_mut(row, col);
        cell.value = value;
        cell.formula = None;
    }

    fn number_format(&self, row: u32, col: u32) -> Option<&str> {
        self.cell(row, col).and_then(|c| c.number_format.as_deref())
    }

    fn set_number_format(&mut self, row: u32, col: u32, format: &str) {
        self.cell_mut(row, col).number_format = Some(format.to_string());
    }

    fn fill(&self, row: u32, col: u32) -> Option<u32> {
        self.cell(row, col).and_then(|c| c.fill)
    }

    fn set_fill(&mut self, row: u32, col: u32, rgb: u32) {
        self.cell_mut(row, col).fill = Some(rgb);
    }
}

// ============================================================================
// WORKBOOK
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Workbook { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, MergeError> {
        let available = self.sheet_names();
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or(MergeError::SheetNotFound {
                name: name.to_string(),
                available,
            })
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_addresses() {
        assert_eq!(CellRef::parse("B4").unwrap(), CellRef::new(4, 2));
        assert_eq!(CellRef::parse("$G$1").unwrap(), CellRef::new(1, 7));
        assert_eq!(CellRef::parse("aa10").unwrap(), CellRef::new(10, 27));
    }

    #[test]
    fn test_reject_bad_addresses() {
        for bad in ["", "4B", "B", "B0", "B-1", "日1"] {
            assert!(CellRef::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_missing_cell_reads_empty() {
        let sheet = Sheet::new("s");
        assert_eq!(sheet.value(10, 10), &CellValue::Empty);
        assert_eq!(sheet.fill(10, 10), None);
        assert_eq!(sheet.max_row(), 0);
    }

    #[test]
    fn test_set_and_read_back() {
        let mut sheet = Sheet::new("s");
        sheet.set_value(3, 4, CellValue::text("x"));
        sheet.set_number_format(3, 1, "yyyy/m/d");
        sheet.set_fill(3, 4, 0xFFC7CE);

        assert_eq!(sheet.value_at(CellRef::new(3, 4)), &CellValue::text("x"));
        assert_eq!(sheet.number_format(3, 1), Some("yyyy/m/d"));
        assert_eq!(sheet.fill(3, 4), Some(0xFFC7CE));
        assert_eq!(sheet.max_row(), 3);
    }

    #[test]
    fn test_writing_a_value_drops_formula() {
        let mut sheet = Sheet::new("s");
        sheet.set_formula(2, 5, "SUM(E3:E10)");
        sheet.set_value(2, 5, CellValue::Number(1.0));
        assert!(sheet.cell(2, 5).unwrap().formula.is_none());
    }

    #[test]
    fn test_sheet_lookup() {
        let mut book = Workbook::new(vec![Sheet::new("表紙"), Sheet::new("【12月】交通費")]);
        assert!(book.sheet_mut("【12月】交通費").is_ok());

        match book.sheet_mut("【1月】交通費") {
            Err(MergeError::SheetNotFound { available, .. }) => assert_eq!(available.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
