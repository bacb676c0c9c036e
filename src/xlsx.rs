// 📗 Workbook I/O
// calamine reads the template values, xlsx_styles its fills and number
// formats, rust_xlsxwriter writes the merged copy.
// Carried across a round trip: values, formulas, number formats and solid
// fills. Fonts, borders, widths and merges are not carried.

use crate::dates::{date_to_serial, serial_to_date};
use crate::grid::{Cell, Grid, Sheet, Workbook};
use crate::xlsx_styles::{read_cell_styles, SheetStyles};
use crate::value::CellValue;
use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDateTime, Timelike};
use rust_xlsxwriter::{Color, Format, Formula, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;
use tracing::{debug, warn};

const DEFAULT_DATE_FORMAT: &str = "yyyy/m/d";
const DEFAULT_DATETIME_FORMAT: &str = "yyyy/m/d h:mm";

// ============================================================================
// LOAD
// ============================================================================

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let mut source = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let names: Vec<String> = source.sheet_names().to_vec();
    if names.is_empty() {
        bail!("Workbook contains no sheets: {}", path.display());
    }

    let styles = read_cell_styles(path, &names).unwrap_or_else(|err| {
        warn!(error = %err, "cell styles not read; fills and number formats dropped");
        Vec::new()
    });

    let mut workbook = Workbook::default();
    for (index, name) in names.iter().enumerate() {
        let range = source
            .worksheet_range(name)
            .with_context(|| format!("Failed to read sheet '{}'", name))?;

        let mut sheet = Sheet::new(name.as_str());
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (r, row) in range.rows().enumerate() {
            for (c, data) in row.iter().enumerate() {
                let value = data_to_value(data);
                if value.is_empty() {
                    continue;
                }
                let (row_no, col_no) = (start_row + r as u32 + 1, start_col + c as u32 + 1);
                if matches!(data, Data::DateTime(_)) {
                    sheet.set_number_format(row_no, col_no, date_format_for(&value));
                }
                sheet.set_value(row_no, col_no, value);
            }
        }

        // formulas after values: writing a value clears the formula slot
        if let Ok(formulas) = source.worksheet_formula(name) {
            let (f_row, f_col) = formulas.start().unwrap_or((0, 0));
            for (r, row) in formulas.rows().enumerate() {
                for (c, formula) in row.iter().enumerate() {
                    if !formula.is_empty() {
                        sheet.set_formula(f_row + r as u32 + 1, f_col + c as u32 + 1, formula.as_str());
                    }
                }
            }
        }

        if let Some(styled) = styles.get(index) {
            apply_styles(&mut sheet, styled);
        }

        debug!(sheet = %name, max_row = sheet.max_row(), "sheet loaded");
        workbook.push(sheet);
    }

    Ok(workbook)
}

/// Stored formats win over the generic date format set from calamine
fn apply_styles(sheet: &mut Sheet, styled: &SheetStyles) {
    for (&(row, col), style) in styled {
        if let Some(code) = &style.number_format {
            sheet.set_number_format(row, col, code);
        }
        if let Some(rgb) = style.fill {
            sheet.set_fill(row, col, rgb);
        }
    }
}

fn data_to_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => serial_to_value(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn serial_to_value(serial: f64) -> CellValue {
    let Some(date) = serial_to_date(serial) else {
        return CellValue::Number(serial);
    };

    let millis = (serial.fract() * 86_400_000.0).round() as i64;
    if millis == 0 {
        return CellValue::Date(date);
    }

    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    CellValue::DateTime(midnight + Duration::milliseconds(millis))
}

fn date_format_for(value: &CellValue) -> &'static str {
    match value {
        CellValue::DateTime(_) => DEFAULT_DATETIME_FORMAT,
        _ => DEFAULT_DATE_FORMAT,
    }
}

// ============================================================================
// SAVE
// ============================================================================

pub fn save_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut book = build(workbook)?;
    book.save(path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;
    Ok(())
}

pub fn workbook_to_bytes(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut book = build(workbook)?;
    book.save_to_buffer().context("Failed to serialize workbook")
}

fn build(workbook: &Workbook) -> Result<XlsxWorkbook> {
    let mut book = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = book
            .add_worksheet()
            .set_name(&sheet.name)
            .with_context(|| format!("Failed to create sheet '{}'", sheet.name))?;

        for (at, cell) in sheet.cells() {
            write_cell(worksheet, at.row - 1, (at.col - 1) as u16, cell)
                .with_context(|| format!("Failed to write cell ({}, {}) in '{}'", at.row, at.col, sheet.name))?;
        }
    }

    Ok(book)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    let format = cell_format(cell);

    if let Some(formula) = &cell.formula {
        let formula = Formula::new(formula).set_result(cell.value.to_string());
        worksheet.write_formula_with_format(row, col, formula, &format)?;
        return Ok(());
    }

    match &cell.value {
        CellValue::Empty => {
            worksheet.write_blank(row, col, &format)?;
        }
        CellValue::Text(s) => {
            worksheet.write_string_with_format(row, col, s, &format)?;
        }
        CellValue::Number(n) => {
            worksheet.write_number_with_format(row, col, *n, &format)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean_with_format(row, col, *b, &format)?;
        }
        CellValue::Date(d) => {
            worksheet.write_number_with_format(row, col, date_to_serial(*d), &format)?;
        }
        CellValue::DateTime(dt) => {
            worksheet.write_number_with_format(row, col, datetime_to_serial(dt), &format)?;
        }
    }

    Ok(())
}

fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let seconds = dt.time().num_seconds_from_midnight() as f64;
    date_to_serial(dt.date()) + seconds / 86_400.0
}

fn cell_format(cell: &Cell) -> Format {
    let mut format = Format::new();

    match (&cell.number_format, &cell.value) {
        (Some(code), _) => format = format.set_num_format(code),
        (None, CellValue::Date(_)) => format = format.set_num_format(DEFAULT_DATE_FORMAT),
        (None, CellValue::DateTime(_)) => format = format.set_num_format(DEFAULT_DATETIME_FORMAT),
        _ => {}
    }

    if let Some(rgb) = cell.fill {
        format = format.set_background_color(Color::RGB(rgb));
    }

    format
}

// ============================================================================
// TESTS
// ============================================================================
