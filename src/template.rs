// 📋 Template metadata
// Person name, home-station keyword and closing date, read from fixed
// cells of the ledger sheet. Also owns the output file naming rule.

use crate::config::TemplateCells;
use crate::dates::resolve_date;
use crate::error::MergeError;
use crate::grid::{CellRef, Grid};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    /// May be empty: then every record is accompanying
    pub home_keyword: String,
    pub closing_date: NaiveDate,
}

impl TemplateInfo {
    /// Read and validate the three metadata cells
    pub fn read<G: Grid + ?Sized>(grid: &G, cells: &TemplateCells) -> Result<Self, MergeError> {
        let name_ref = CellRef::parse(&cells.name)?;
        let home_ref = CellRef::parse(&cells.home_station)?;
        let closing_ref = CellRef::parse(&cells.closing_date)?;

        let name = grid.value_at(name_ref).normalized_text();
        if name.is_empty() {
            return Err(MergeError::EmptyName {
                cell: cells.name.clone(),
            });
        }

        let home_keyword = grid.value_at(home_ref).normalized_text();

        let closing_value = grid.value_at(closing_ref);
        let closing_date = resolve_date(closing_value).ok_or_else(|| MergeError::ClosingDate {
            cell: cells.closing_date.clone(),
            found: closing_value.to_string(),
        })?;

        Ok(TemplateInfo {
            name,
            home_keyword,
            closing_date,
        })
    }

    pub fn output_file_name(&self, organization: &str) -> String {
        output_file_name(organization, self.closing_date, &self.name)
    }
}

/// `（<org>・<MMDD>）<name>.xlsx`
pub fn output_file_name(organization: &str, closing_date: NaiveDate, name: &str) -> String {
    let safe_name: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();

    format!(
        "（{}・{:02}{:02}）{}.xlsx",
        organization,
        closing_date.month(),
        closing_date.day(),
        safe_name
    )
}
