// 🚂 Merge pipeline
//
//   template → normalize → scan → dedup → continuity + append
//
// `MergePlan::prepare` runs every fatal check and reads the ledger without
// touching it; only `MergePlan::apply` writes. A failed run therefore
// leaves the sheet exactly as it was.

use crate::classifier::DestinationLabels;
use crate::config::MergeConfig;
use crate::continuity::{ContinuityTracker, Verdict};
use crate::deduplication::{DeduplicationEngine, DeduplicationOutcome};
use crate::error::MergeError;
use crate::grid::Grid;
use crate::normalizer::{DiscardedRow, Normalized, RecordNormalizer};
use crate::record::Record;
use crate::scanner::{LedgerRegion, LedgerScanner};
use crate::source::{CsvExport, RecordSource, SourceRow};
use crate::template::TemplateInfo;
use crate::writer::{AppendSummary, AppendWriter};
use crate::xlsx::{load_workbook, save_workbook};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, info_span, warn};
use uuid::Uuid;

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedRow {
    pub row: u32,
    pub source_line: usize,
    pub carried_exit: String,
    pub entry: String,
}

/// One record as it will be (or was) written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub row: u32,
    pub date: NaiveDate,
    pub destination: String,
    pub mode: String,
    pub route: String,
    pub amount: i64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub run_id: Uuid,

    /// SHA-256 of the source bytes, when the run read a file
    pub source_fingerprint: Option<String>,

    pub source_rows: usize,
    pub valid_records: usize,
    pub discarded: Vec<DiscardedRow>,
    pub duplicates_skipped: usize,
    pub appended: usize,
    pub flagged: usize,
    pub header_row: u32,
    pub first_written_row: Option<u32>,
    pub flagged_rows: Vec<FlaggedRow>,
    pub output_name: String,
    pub preview: Vec<PreviewRow>,
}

// ============================================================================
// PLAN
// ============================================================================

/// Everything the append needs, computed read-only
#[derive(Debug, Clone)]
pub struct MergePlan {
    pub template: TemplateInfo,
    pub source_rows: usize,
    pub normalized: Normalized,
    pub region: LedgerRegion,
    pub last_route: Option<String>,
    pub dedup: DeduplicationOutcome,
}

impl MergePlan {
    pub fn prepare<G: Grid + ?Sized>(
        grid: &G,
        rows: &[SourceRow],
        config: &MergeConfig,
    ) -> Result<Self, MergeError> {
        let template = TemplateInfo::read(grid, &config.cells)?;
        if template.home_keyword.is_empty() {
            warn!(cell = %config.cells.home_station, "home station cell is empty; every record is accompanying");
        }

        let scanner = LedgerScanner::new(config.header_marker.as_str(), config.bounds);
        let region = scanner.locate(grid)?;

        let normalized =
            RecordNormalizer::new(&template.home_keyword, &config.mode_label).normalize_all(rows);

        let existing = scanner.collect_existing_keys(grid, region.first_data_row());
        let last_route = scanner.last_route(grid, &region);
        let dedup = DeduplicationEngine::new(&existing, &config.labels).partition(&normalized.records);

        info!(
            source_rows = rows.len(),
            valid = normalized.records.len(),
            discarded = normalized.discarded.len(),
            existing = existing.len(),
            duplicates = dedup.skipped(),
            net_new = dedup.net_new.len(),
            "merge planned"
        );

        Ok(MergePlan {
            template,
            source_rows: rows.len(),
            normalized,
            region,
            last_route,
            dedup,
        })
    }

    /// Rows the append would produce, without writing
    pub fn preview(&self, labels: &DestinationLabels) -> Vec<PreviewRow> {
        let mut tracker = ContinuityTracker::seeded(self.last_route.as_deref());

        self.dedup
            .net_new
            .iter()
            .enumerate()
            .map(|(offset, record)| PreviewRow {
                row: self.region.first_blank_row + offset as u32,
                date: record.date(),
                destination: labels.label(record.destination()).to_string(),
                mode: record.mode().to_string(),
                route: record.route().to_string(),
                amount: record.amount(),
                flagged: tracker.advance(record.route()).is_break(),
            })
            .collect()
    }

    /// Write the net-new records. Infallible: all checks already ran.
    pub fn apply<G: Grid + ?Sized>(self, grid: &mut G, config: &MergeConfig, run_id: Uuid) -> MergeReport {
        let preview = self.preview(&config.labels);
        let writer = AppendWriter::new(&config.labels, &config.date_format, config.alert_fill);
        let summary = writer.append(grid, &self.region, self.last_route.as_deref(), &self.dedup.net_new);

        let report = self.into_report(run_id, &summary, preview, &config.organization);
        info!(
            appended = report.appended,
            flagged = report.flagged,
            first_row = ?report.first_written_row,
            output = %report.output_name,
            "merge applied"
        );
        report
    }

    fn into_report(
        self,
        run_id: Uuid,
        summary: &AppendSummary,
        preview: Vec<PreviewRow>,
        organization: &str,
    ) -> MergeReport {
        let flagged_rows: Vec<FlaggedRow> = summary
            .flagged()
            .filter_map(|written| match &written.verdict {
                Verdict::Break { carried_exit, entry } => Some(FlaggedRow {
                    row: written.row,
                    source_line: written.source_line,
                    carried_exit: carried_exit.clone(),
                    entry: entry.clone(),
                }),
                _ => None,
            })
            .collect();

        MergeReport {
            run_id,
            source_fingerprint: None,
            source_rows: self.source_rows,
            valid_records: self.normalized.records.len(),
            discarded: self.normalized.discarded,
            duplicates_skipped: self.dedup.skipped(),
            appended: summary.appended(),
            flagged: flagged_rows.len(),
            header_row: self.region.header_row,
            first_written_row: summary.first_row(),
            flagged_rows,
            output_name: self.template.output_file_name(organization),
            preview,
        }
    }
}

/// Merge `rows` into `grid` in one step
pub fn merge_into_sheet<G: Grid + ?Sized>(
    grid: &mut G,
    rows: &[SourceRow],
    config: &MergeConfig,
) -> Result<MergeReport, MergeError> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("merge", %run_id).entered();

    let plan = MergePlan::prepare(&*grid, rows, config)?;
    Ok(plan.apply(grid, config, run_id))
}

// ============================================================================
// FILE-LEVEL RUN
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: PathBuf,
    pub ledger: PathBuf,
    pub out_dir: PathBuf,
    pub config: MergeConfig,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: MergeReport,

    /// Normalized source records in write order, duplicates included
    pub records: Vec<Record>,

    /// None on a dry run
    pub output_path: Option<PathBuf>,
}

/// Load ledger + source, merge, save a new workbook into `out_dir`.
/// The input ledger file is never overwritten.
pub fn run(options: &RunOptions) -> Result<RunOutcome> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("merge", %run_id).entered();
    let config = &options.config;

    let source = CsvExport::new(&options.source);
    let feed = source.read_feed(&config.columns)?;

    let mut workbook = load_workbook(&options.ledger)?;
    let sheet = workbook.sheet_mut(&config.sheet)?;

    let plan = MergePlan::prepare(&*sheet, &feed.rows, config)?;
    let records = plan.normalized.records.clone();

    let mut report = plan.apply(sheet, config, run_id);
    report.source_fingerprint = Some(feed.fingerprint.clone());

    if options.dry_run {
        info!("dry run: nothing saved");
        return Ok(RunOutcome {
            report,
            records,
            output_path: None,
        });
    }

    fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("Failed to create output directory: {}", options.out_dir.display()))?;
    let output_path = options.out_dir.join(&report.output_name);
    save_workbook(&workbook, &output_path)?;
    info!(path = %output_path.display(), "merged ledger saved");

    Ok(RunOutcome {
        report,
        records,
        output_path: Some(output_path),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Sheet;
    use crate::scanner::{COL_AMOUNT, COL_DATE, COL_DESTINATION, COL_MODE, COL_ROUTE};
    use crate::value::CellValue;

    fn template() -> Sheet {
        let mut sheet = Sheet::new("【12月】交通費");
        sheet.set_value(1, 7, CellValue::text("2024/04/25"));
        sheet.set_value(4, 2, CellValue::text("山田太郎"));
        sheet.set_value(5, 2, CellValue::text("荻窪"));
        sheet.set_value(8, COL_DATE, CellValue::text("日付"));
        sheet.set_value(8, COL_ROUTE, CellValue::text("経路"));
        sheet
    }

    fn existing_row(sheet: &mut Sheet, row: u32, date: &str, route: &str, amount: f64) {
        sheet.set_value(row, COL_DATE, CellValue::text(date));
        sheet.set_value(row, COL_DESTINATION, CellValue::text("同行"));
        sheet.set_value(row, COL_MODE, CellValue::text("電車"));
        sheet.set_value(row, COL_ROUTE, CellValue::text(route));
        sheet.set_value(row, COL_AMOUNT, CellValue::Number(amount));
    }

    #[test]
    fn test_report_counts() {
        let mut sheet = template();
        existing_row(&mut sheet, 9, "2024/04/01", "入A駅(山手線)出B駅(山手線)", 200.0);

        let rows = vec![
            SourceRow::new(2, "2024/04/01", "入A駅(山手線)出B駅(山手線)", "-200"),
            SourceRow::new(3, "2024/04/02", "入C駅(中央線)出D駅(中央線)", "-150"),
            SourceRow::new(4, "合計", "", "350"),
        ];

        let report = merge_into_sheet(&mut sheet, &rows, &MergeConfig::default()).unwrap();
        assert_eq!(report.source_rows, 3);
        assert_eq!(report.valid_records, 2);
        assert_eq!(report.discarded.len(), 1);
        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(report.appended, 1);
        assert_eq!(report.header_row, 8);
        assert_eq!(report.first_written_row, Some(10));
        assert_eq!(report.output_name, "（JACOM・0425）山田太郎.xlsx");
        assert_eq!(
            report.flagged_rows,
            vec![FlaggedRow {
                row: 10,
                source_line: 3,
                carried_exit: "B駅".to_string(),
                entry: "C駅".to_string(),
            }]
        );
    }

    #[test]
    fn test_preview_matches_what_is_written() {
        let mut sheet = template();
        existing_row(&mut sheet, 9, "2024/04/01", "入A駅(山手線)出B駅(山手線)", 200.0);
        let rows = vec![
            SourceRow::new(2, "2024/04/03", "入D駅(中央線)出A駅(中央線)", "150"),
            SourceRow::new(3, "2024/04/02", "入B駅(山手線)出D駅(中央線)", "150"),
        ];

        let plan = MergePlan::prepare(&sheet, &rows, &MergeConfig::default()).unwrap();
        let preview = plan.preview(&MergeConfig::default().labels);
        let before = sheet.clone();
        let report = plan.apply(&mut sheet, &MergeConfig::default(), Uuid::new_v4());

        assert_ne!(before, sheet);
        assert_eq!(report.preview, preview);
        let flagged: Vec<u32> = preview.iter().filter(|p| p.flagged).map(|p| p.row).collect();
        let written: Vec<u32> = report.flagged_rows.iter().map(|f| f.row).collect();
        assert_eq!(flagged, written);
        assert!(written.is_empty());
    }

    #[test]
    fn test_prepare_never_writes() {
        let sheet = template();
        let rows = vec![SourceRow::new(2, "2024/04/02", "x", "1")];
        let before = sheet.clone();
        let plan = MergePlan::prepare(&sheet, &rows, &MergeConfig::default()).unwrap();
        assert_eq!(plan.dedup.net_new.len(), 1);
        assert_eq!(sheet, before);
    }

    #[test]
    fn test_fatal_errors_leave_sheet_untouched() {
        let rows = vec![SourceRow::new(2, "2024/04/02", "x", "1")];

        let mut no_header = template();
        no_header.set_value(8, COL_DATE, CellValue::text("日付け"));
        let before = no_header.clone();
        let err = merge_into_sheet(&mut no_header, &rows, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::HeaderNotFound { .. }));
        assert_eq!(no_header, before);

        let mut no_name = template();
        no_name.set_value(4, 2, CellValue::Empty);
        let before = no_name.clone();
        let err = merge_into_sheet(&mut no_name, &rows, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::EmptyName { .. }));
        assert_eq!(no_name, before);
    }

    fn write_inputs(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        let source = dir.join("export.csv");
        fs::write(
            &source,
            "日付,内容,金額\n2024/04/02,入C駅(中央線)出荻窪(中央線),-150\n",
        )
        .unwrap();

        let ledger = dir.join("template.xlsx");
        let workbook = crate::grid::Workbook::new(vec![Sheet::new("表紙"), template()]);
        save_workbook(&workbook, &ledger).unwrap();
        (source, ledger)
    }

    #[test]
    fn test_run_writes_named_output() {
        let dir = tempfile::tempdir().unwrap();
        let (source, ledger) = write_inputs(dir.path());

        let outcome = run(&RunOptions {
            source,
            ledger,
            out_dir: dir.path().join("out"),
            config: MergeConfig::default(),
            dry_run: false,
        })
        .unwrap();

        let path = outcome.output_path.unwrap();
        assert!(path.ends_with("（JACOM・0425）山田太郎.xlsx"));
        assert!(path.exists());
        assert_eq!(outcome.report.appended, 1);
        assert_eq!(outcome.report.preview[0].destination, "自宅");
        assert_eq!(outcome.report.source_fingerprint.as_ref().map(|f| f.len()), Some(64));
        assert_eq!(outcome.records.len(), 1);

        let mut merged = load_workbook(&path).unwrap();
        let sheet = merged.sheet_mut("【12月】交通費").unwrap();
        assert_eq!(sheet.value(9, COL_ROUTE), &CellValue::text("入C駅(中央線)出荻窪(中央線)"));
        assert_eq!(sheet.value(9, COL_AMOUNT).to_int(), 150);
    }

    #[test]
    fn test_dry_run_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (source, ledger) = write_inputs(dir.path());
        let out_dir = dir.path().join("out");

        let outcome = run(&RunOptions {
            source,
            ledger,
            out_dir: out_dir.clone(),
            config: MergeConfig::default(),
            dry_run: true,
        })
        .unwrap();

        assert!(outcome.output_path.is_none());
        assert_eq!(outcome.report.appended, 1);
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_missing_sheet_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (source, ledger) = write_inputs(dir.path());
        let config = MergeConfig {
            sheet: "【1月】交通費".to_string(),
            ..MergeConfig::default()
        };

        let err = run(&RunOptions {
            source,
            ledger,
            out_dir: dir.path().join("out"),
            config,
            dry_run: false,
        })
        .unwrap_err();

        match err.downcast_ref::<MergeError>() {
            Some(MergeError::SheetNotFound { available, .. }) => {
                assert_eq!(available, &vec!["表紙".to_string(), "【12月】交通費".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
    }
}
