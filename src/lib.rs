// Fare Ledger - Core Library
// Merges periodic transit-fare exports into a monthly expense ledger workbook.
// Exposes all modules for use in the CLI and tests.

pub mod error;
pub mod value;
pub mod dates;
pub mod config;
pub mod grid;
pub mod xlsx;           // Workbook I/O (calamine / rust_xlsxwriter)
pub mod xlsx_styles;    // Fills + number formats from the xlsx package
pub mod source;         // Source feed decoding
pub mod route;          // Station pair extraction
pub mod classifier;     // Home vs accompanying
pub mod record;
pub mod normalizer;
pub mod template;
pub mod scanner;        // Ledger header / blank-row anchors
pub mod deduplication;
pub mod continuity;
pub mod writer;
pub mod pipeline;

// Re-export commonly used types
pub use error::MergeError;
pub use value::{coerce_int, CellValue};
pub use dates::{date_to_serial, parse_date_text, resolve_date, serial_to_date};
pub use config::{ColumnSynonyms, MergeConfig, ScanBounds, TemplateCells};
pub use grid::{Cell, CellRef, Grid, Sheet, Workbook};
pub use xlsx::{load_workbook, save_workbook, workbook_to_bytes};
pub use source::{
    decode_text, parse_csv_bytes, resolve_columns,
    ColumnMapping, CsvExport, RecordSource, ResolvedColumn, SourceFeed, SourceRow,
};
pub use route::{parse_route, StationPair, EXIT_MARKER};
pub use classifier::{Destination, DestinationClassifier, DestinationLabels};
pub use record::{IdentityKey, Record};
pub use normalizer::{DiscardedRow, Normalized, RecordNormalizer};
pub use template::{output_file_name, TemplateInfo};
pub use scanner::{LedgerRegion, LedgerScanner};
pub use deduplication::{DeduplicationEngine, DeduplicationOutcome};
pub use continuity::{ContinuityTracker, Verdict};
pub use writer::{AppendSummary, AppendWriter, WrittenRow};
pub use pipeline::{
    merge_into_sheet, run,
    FlaggedRow, MergePlan, MergeReport, PreviewRow, RunOptions, RunOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
