use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fare_ledger::{run, MergeConfig, MergeReport, Record, RunOptions, RunOutcome};

#[derive(Parser, Debug)]
#[command(author, version, about = "Merge transit-fare exports into a monthly expense ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a fare export into the ledger and save a new workbook
    Merge(MergeArgs),
    /// Show what a merge would append; never writes
    Plan(MergeArgs),
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Fare export (CSV, UTF-8 or CP932)
    #[arg(long, value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Ledger template workbook (.xlsx)
    #[arg(long, value_hint = ValueHint::FilePath)]
    ledger: PathBuf,

    /// Directory for the merged workbook
    #[arg(long, default_value = ".", env = "FARE_LEDGER_OUT_DIR", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// JSON config; flags below override it
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Target sheet name
    #[arg(long)]
    sheet: Option<String>,

    /// Cell holding the person's name (A1 style)
    #[arg(long)]
    name_cell: Option<String>,

    /// Cell holding the home-station keyword
    #[arg(long)]
    home_cell: Option<String>,

    /// Cell holding the closing date
    #[arg(long)]
    closing_cell: Option<String>,

    /// Merge in memory only
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Print the run report as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl MergeArgs {
    fn load_config(&self) -> Result<MergeConfig> {
        let mut config = match &self.config {
            Some(path) => MergeConfig::from_file(path)?,
            None => MergeConfig::default(),
        };

        if let Some(sheet) = &self.sheet {
            config.sheet = sheet.clone();
        }
        if let Some(cell) = &self.name_cell {
            config.cells.name = cell.clone();
        }
        if let Some(cell) = &self.home_cell {
            config.cells.home_station = cell.clone();
        }
        if let Some(cell) = &self.closing_cell {
            config.cells.closing_date = cell.clone();
        }

        Ok(config)
    }

    fn run_options(&self, dry_run: bool) -> Result<RunOptions> {
        Ok(RunOptions {
            source: self.source.clone(),
            ledger: self.ledger.clone(),
            out_dir: self.out_dir.clone(),
            config: self.load_config()?,
            dry_run,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Command::Merge(args) | Command::Plan(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Merge(args) => handle_merge(args),
        Command::Plan(args) => handle_plan(args),
    }
}

fn handle_merge(args: MergeArgs) -> Result<()> {
    let outcome = run(&args.run_options(args.dry_run)?)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }

    print_summary(&outcome);
    Ok(())
}

fn handle_plan(args: MergeArgs) -> Result<()> {
    let outcome = run(&args.run_options(true)?)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }

    println!("📋 Normalized records ({})", outcome.records.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print_records(&outcome.records);

    println!("\n✍️  Append preview ({})", outcome.report.preview.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print_preview(&outcome.report);

    println!();
    print_summary(&outcome);
    Ok(())
}

// ============================================================================
// TEXT OUTPUT
// ============================================================================

fn print_records(records: &[Record]) {
    println!("{:<6} {:<12} {:<6} {:>8}  {}", "line", "date", "mode", "amount", "route");
    for record in records {
        println!(
            "{:<6} {:<12} {:<6} {:>8}  {}",
            record.source_line(),
            record.date().format("%Y-%m-%d"),
            record.mode(),
            record.amount(),
            record.route()
        );
    }
}

fn print_preview(report: &MergeReport) {
    println!("{:<6} {:<12} {:<6} {:>8}  {:<2} {}", "row", "date", "dest", "amount", "!", "route");
    for row in &report.preview {
        println!(
            "{:<6} {:<12} {:<6} {:>8}  {:<2} {}",
            row.row,
            row.date.format("%Y-%m-%d"),
            row.destination,
            row.amount,
            if row.flagged { "⚠" } else { "" },
            row.route
        );
    }
}

fn print_summary(outcome: &RunOutcome) {
    let report = &outcome.report;

    println!("✓ Source rows:        {}", report.source_rows);
    println!("✓ Valid records:      {}", report.valid_records);
    if !report.discarded.is_empty() {
        println!("⚠ Discarded (no date): {}", report.discarded.len());
        for row in &report.discarded {
            println!("    line {}: '{}' {}", row.line, row.date, row.content);
        }
    }
    println!("✓ Already in ledger:  {}", report.duplicates_skipped);
    println!("✓ Appended:           {}", report.appended);
    if let Some(first) = report.first_written_row {
        println!("  starting at row {}", first);
    }

    if report.flagged > 0 {
        println!("⚠ Continuity breaks:  {}", report.flagged);
        for flag in &report.flagged_rows {
            println!("    row {}: exit {} → entry {}", flag.row, flag.carried_exit, flag.entry);
        }
    }

    match &outcome.output_path {
        Some(path) => println!("\n💾 Saved: {}", path.display()),
        None => println!("\n🔍 Dry run: {} not written", report.output_name),
    }
}
