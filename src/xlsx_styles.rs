// 🎨 XLSX cell styles
// calamine exposes values only, so fills and number formats are read straight
// from the package: xl/styles.xml for the style table, each worksheet's
// <c s="N"> attribute for the per-cell style index.
// Only solid RGB fills and number format codes are carried; theme and
// indexed colours are ignored.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// The part of a cell style the ledger cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub number_format: Option<String>,
    /// RGB, alpha dropped
    pub fill: Option<u32>,
}

impl CellStyle {
    pub fn is_plain(&self) -> bool {
        self.number_format.is_none() && self.fill.is_none()
    }
}

/// Resolved `cellXfs`, indexed by the `s` attribute of a cell
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: Vec<CellStyle>,
}

impl StyleTable {
    pub fn get(&self, index: usize) -> Option<&CellStyle> {
        self.styles.get(index)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Styled cells of one sheet: 1-based (row, col) → style
pub type SheetStyles = HashMap<(u32, u32), CellStyle>;

// ============================================================================
// PACKAGE ENTRY POINT
// ============================================================================

/// Styled cells for each of `sheet_names`, in order.
/// A sheet whose part cannot be found yields an empty map.
pub fn read_cell_styles(path: &Path, sheet_names: &[String]) -> Result<Vec<SheetStyles>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open workbook for styles: {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read workbook as zip: {}", path.display()))?;

    let table = match read_part(&mut archive, "xl/styles.xml") {
        Some(xml) => parse_styles_xml(&xml),
        None => return Ok(sheet_names.iter().map(|_| SheetStyles::new()).collect()),
    };

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_part(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let parts = worksheet_parts(&workbook_xml, &rels_xml, sheet_names);

    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        let styled = part
            .and_then(|p| read_part(&mut archive, &p))
            .map(|xml| resolve_sheet_styles(&parse_cell_style_ids(&xml), &table))
            .unwrap_or_default();
        out.push(styled);
    }

    Ok(out)
}

fn resolve_sheet_styles(ids: &[(u32, u32, usize)], table: &StyleTable) -> SheetStyles {
    ids.iter()
        .filter_map(|&(row, col, id)| {
            let style = table.get(id)?;
            (!style.is_plain()).then(|| ((row, col), style.clone()))
        })
        .collect()
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

// ============================================================================
// styles.xml
// ============================================================================

pub fn parse_styles_xml(xml: &str) -> StyleTable {
    let custom = parse_num_fmts(xml);
    let fills = parse_fills(xml);

    let styles = parse_cell_xfs(xml)
        .into_iter()
        .map(|(num_fmt_id, fill_id)| CellStyle {
            number_format: num_fmt_id.and_then(|id| {
                custom.get(&id).cloned().or_else(|| builtin_number_format(id).map(str::to_string))
            }),
            fill: fill_id.and_then(|id| fills.get(id).copied().flatten()),
        })
        .collect();

    StyleTable { styles }
}

/// <numFmts> → id → format code
fn parse_num_fmts(xml: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_num_fmts = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"numFmts" => in_num_fmts = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"numFmts" => break,
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_num_fmts && e.name().as_ref() == b"numFmt" =>
            {
                let id = attr(e, b"numFmtId").and_then(|v| v.parse().ok());
                let code = attr(e, b"formatCode").map(|v| unescape_xml(&v));
                if let (Some(id), Some(code)) = (id, code) {
                    map.insert(id, code);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    map
}

/// <fills> → per fill, the solid RGB colour if any
fn parse_fills(xml: &str) -> Vec<Option<u32>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_fills = false;
    let mut solid = false;
    let mut fg: Option<u32> = None;
    let mut bg: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            // <fill/> still takes an index
            Ok(Event::Empty(ref e)) if in_fills && e.name().as_ref() == b"fill" => fills.push(None),
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"fills" => in_fills = true,
                b"fill" if in_fills => {
                    solid = false;
                    fg = None;
                    bg = None;
                }
                b"patternFill" if in_fills => {
                    solid = attr(e, b"patternType").as_deref() == Some("solid");
                }
                b"fgColor" if in_fills => fg = attr(e, b"rgb").and_then(|v| parse_argb(&v)),
                b"bgColor" if in_fills => bg = attr(e, b"rgb").and_then(|v| parse_argb(&v)),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"fill" if in_fills => fills.push(if solid { fg.or(bg) } else { None }),
                b"fills" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fills
}

/// <cellXfs> → per xf, (numFmtId, fillId)
fn parse_cell_xfs(xml: &str) -> Vec<(Option<u16>, Option<usize>)> {
    let mut xfs = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if in_cell_xfs && e.name().as_ref() == b"xf" =>
            {
                let num_fmt_id = attr(e, b"numFmtId").and_then(|v| v.parse().ok());
                let fill_id = attr(e, b"fillId").and_then(|v| v.parse().ok());
                xfs.push((num_fmt_id, fill_id));
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    xfs
}

/// Codes for the built-in ids a template is likely to use; 0 (General) is none
fn builtin_number_format(id: u16) -> Option<&'static str> {
    let code = match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

// ============================================================================
// WORKSHEETS
// ============================================================================

/// Every <c r=".." s="N"> with N > 0, as 1-based (row, col, N)
pub fn parse_cell_style_ids(xml: &str) -> Vec<(u32, u32, usize)> {
    let mut cells = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"c" => {
                let style = attr(e, b"s").and_then(|v| v.parse::<usize>().ok());
                let at = attr(e, b"r").and_then(|v| parse_a1(&v));
                if let (Some(style), Some((row, col))) = (style, at) {
                    if style > 0 {
                        cells.push((row, col, style));
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    cells
}

/// Package path of each named sheet, via workbook.xml and its rels
fn worksheet_parts(workbook_xml: &str, rels_xml: &str, sheet_names: &[String]) -> Vec<Option<String>> {
    let sheet_rids = collect_pairs(workbook_xml, b"sheet", b"name", b"r:id");
    let targets: HashMap<String, String> = collect_pairs(rels_xml, b"Relationship", b"Id", b"Target")
        .into_iter()
        .collect();

    sheet_names
        .iter()
        .map(|name| {
            let rid = sheet_rids.iter().find(|(n, _)| n == name).map(|(_, r)| r)?;
            let target = targets.get(rid)?;
            Some(match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{}", target),
            })
        })
        .collect()
}

fn collect_pairs(xml: &str, element: &[u8], key: &[u8], value: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == element => {
                if let (Some(k), Some(v)) = (attr(e, key), attr(e, value)) {
                    pairs.push((unescape_xml(&k), v));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    pairs
}

// ============================================================================
// HELPERS
// ============================================================================

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// "FFFFC7CE" / "FFC7CE" → 0xFFC7CE
fn parse_argb(hex: &str) -> Option<u32> {
    let hex = hex.trim_start_matches('#');
    let rgb = match hex.len() {
        8 => &hex[2..],
        6 => hex,
        _ => return None,
    };
    u32::from_str_radix(rgb, 16).ok()
}

/// "D10" → (10, 4)
fn parse_a1(r: &str) -> Option<(u32, u32)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    let row: u32 = digits.parse().ok()?;
    (row > 0).then_some((row, col))
}

// ============================================================================
// TESTS
// ============================================================================
