//! Drives a consolidation run: discovery, per-file ingestion on a worker
//! pool, ordered assembly of the output on a single thread, summary
//! finalisation, and persistence.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use rayon::prelude::*;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::aideon::consolidate::config::ConsolidateOptions;
use crate::aideon::consolidate::error::{ConsolidateError, Result};
use crate::aideon::consolidate::io::discover::discover_sources;
use crate::aideon::consolidate::io::excel_read::read_workbook;
use crate::aideon::consolidate::io::excel_write::write_workbook;
use crate::aideon::consolidate::io::legacy::LegacyConverter;
use crate::aideon::consolidate::io::validate::validate_workbook;
use crate::aideon::consolidate::model::{OutputWorkbook, SourceFile, SourceFormat, Workbook};
use crate::aideon::consolidate::replicate::replicate_sheet;
use crate::aideon::consolidate::summary::{SummaryAggregator, materialize};

/// Lifecycle of one source file. A file that fails leaves the lifecycle at
/// the last stage it reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Discovered,
    Validated,
    Normalized,
    Opened,
    SheetsProcessed,
    Closed,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStage::Discovered => "discovered",
            FileStage::Validated => "validated",
            FileStage::Normalized => "normalized",
            FileStage::Opened => "opened",
            FileStage::SheetsProcessed => "sheets processed",
            FileStage::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// A source file that was left out of the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    /// Last stage reached before the failure.
    pub stage: FileStage,
    pub reason: String,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub output: PathBuf,
    pub discovered: usize,
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    /// Output sheet names in workbook order.
    pub sheets: Vec<String>,
    pub renamed_sheets: usize,
    /// Rows of the consolidated summary sheet, header included; 0 when
    /// there is none.
    pub summary_rows: usize,
    pub summary_contributors: Vec<PathBuf>,
    pub header_mismatches: Vec<PathBuf>,
    pub style_failures: usize,
    pub skipped_cells: usize,
    pub skipped_merges: usize,
}

impl RunReport {
    pub fn has_summary(&self) -> bool {
        self.summary_rows > 0
    }
}

/// Result of ingesting one file on a worker.
enum Ingest {
    Ready {
        source: SourceFile,
        workbook: Workbook,
        /// Holds the normalized copy of a legacy file until it is closed.
        workspace: Option<TempDir>,
    },
    Skipped(SkippedFile),
}

/// Consolidates every workbook in `options.input_dir` into `options.output`.
///
/// Per-file and per-cell failures are recorded in the returned report. Only
/// setup errors, an empty input directory, a run where every file was
/// skipped, and a failure to persist the output are returned as errors.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %options.input_dir.display(), output = %options.output.display())
)]
pub fn consolidate(options: &ConsolidateOptions) -> Result<RunReport> {
    options.validate()?;

    let mut sources = discover_sources(&options.input_dir)?;
    if let Ok(existing_output) = fs::canonicalize(&options.output) {
        sources.retain(|source| {
            fs::canonicalize(&source.path).map_or(true, |path| path != existing_output)
        });
        if sources.is_empty() {
            return Err(ConsolidateError::NoInputFiles(options.input_dir.clone()));
        }
    }
    info!(files = sources.len(), "discovered source workbooks");

    let mut builder = tempfile::Builder::new();
    builder.prefix("aideon-consolidate-");
    let run_dir = match &options.work_dir {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            builder.tempdir_in(parent)?
        }
        None => builder.tempdir()?,
    };
    let converter = options.converter();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.worker_count())
        .build()
        .map_err(|error| ConsolidateError::Config(error.to_string()))?;

    let assembly = assemble(&sources, converter.as_ref(), run_dir.path(), &pool, options)?;
    let Assembly {
        mut output,
        summary,
        mut report,
    } = assembly;

    if report.processed.is_empty() {
        close_run_dir(run_dir);
        return Err(ConsolidateError::NothingProcessed(sources.len()));
    }

    if let Some(summary) = summary.finish() {
        let (sheet, failures) = materialize(&summary, &options.summary_sheet);
        for failure in &failures {
            warn!(path = %failure.origin.display(), error = %failure.error, "style copy failed");
        }
        report.style_failures += failures.len();
        report.summary_rows = summary.row_count();
        report.summary_contributors = summary.contributors;
        report.header_mismatches = summary.mismatched;
        output.set_summary(sheet);
    } else {
        debug!("no summary sheet found; output has no summary");
    }

    report.discovered = sources.len();
    report.output = options.output.clone();
    report.sheets = output.sheet_names().into_iter().map(str::to_string).collect();

    let written = write_workbook(&options.output, &output);
    close_run_dir(run_dir);
    let stats =
        written.map_err(|error| ConsolidateError::output_write(&options.output, error))?;
    report.skipped_cells = stats.skipped_cells;
    report.skipped_merges = stats.skipped_merges;

    info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        sheets = report.sheets.len(),
        summary_rows = report.summary_rows,
        style_failures = report.style_failures,
        skipped_merges = report.skipped_merges,
        "consolidation completed"
    );
    Ok(report)
}

/// Single owner of the output while a run is in progress.
struct Assembly {
    output: OutputWorkbook,
    summary: SummaryAggregator,
    report: RunReport,
}

impl Assembly {
    fn new(options: &ConsolidateOptions) -> Self {
        Self {
            output: OutputWorkbook::new(&options.summary_sheet),
            summary: SummaryAggregator::new(options.header_policy),
            report: RunReport::default(),
        }
    }

    fn apply(&mut self, ingest: Ingest, summary_sheet: &str) {
        match ingest {
            Ingest::Skipped(skipped) => {
                warn!(
                    path = %skipped.path.display(),
                    stage = %skipped.stage,
                    reason = %skipped.reason,
                    "skipping workbook"
                );
                self.report.skipped.push(skipped);
            }
            Ingest::Ready {
                source,
                workbook,
                workspace,
            } => {
                if let Some(sheet) = workbook.sheet(summary_sheet) {
                    self.summary.push(&source.path, sheet);
                }
                for sheet in workbook.sheets.iter().filter(|sheet| sheet.name != summary_sheet) {
                    let replicated = replicate_sheet(sheet, &mut self.output);
                    if replicated.renamed() {
                        info!(
                            path = %source.path.display(),
                            from = %replicated.source_name,
                            to = %replicated.output_name,
                            "renamed sheet to avoid a collision"
                        );
                        self.report.renamed_sheets += 1;
                    }
                    for failure in &replicated.style_failures {
                        warn!(path = %source.path.display(), error = %failure, "style copy failed");
                    }
                    self.report.style_failures += replicated.style_failures.len();
                }
                log_stage(&source.path, FileStage::SheetsProcessed);

                drop(workbook);
                if let Some(workspace) = workspace {
                    if let Err(error) = workspace.close() {
                        warn!(path = %source.path.display(), error = %error, "failed to delete normalized copy");
                    }
                }
                log_stage(&source.path, FileStage::Closed);
                self.report.processed.push(source.path);
            }
        }
    }
}

/// Ingests every source on `pool` and applies the results, in enumeration
/// order, on one assembly thread.
fn assemble(
    sources: &[SourceFile],
    converter: &dyn LegacyConverter,
    run_dir: &Path,
    pool: &rayon::ThreadPool,
    options: &ConsolidateOptions,
) -> Result<Assembly> {
    let (sender, receiver) = mpsc::channel::<(usize, Ingest)>();

    thread::scope(|scope| {
        let assembler = scope.spawn(move || {
            let mut assembly = Assembly::new(options);
            let mut pending: BTreeMap<usize, Ingest> = BTreeMap::new();
            let mut next = 0;
            for (index, ingest) in receiver {
                pending.insert(index, ingest);
                while let Some(ingest) = pending.remove(&next) {
                    assembly.apply(ingest, &options.summary_sheet);
                    next += 1;
                }
            }
            assembly
        });

        pool.install(|| {
            sources
                .par_iter()
                .enumerate()
                .for_each_with(sender, |sender, (index, source)| {
                    let ingest = ingest(source, converter, run_dir);
                    // The receiver only goes away if the assembler panicked,
                    // which surfaces through join below.
                    let _ = sender.send((index, ingest));
                });
        });

        assembler
            .join()
            .map_err(|_| ConsolidateError::Writer("assembly thread panicked".into()))
    })
}

/// Validates, normalizes, and reads one source file.
fn ingest(source: &SourceFile, converter: &dyn LegacyConverter, run_dir: &Path) -> Ingest {
    let skip = |stage: FileStage, error: ConsolidateError| {
        Ingest::Skipped(SkippedFile {
            path: source.path.clone(),
            stage,
            reason: error.to_string(),
        })
    };
    log_stage(&source.path, FileStage::Discovered);

    if let Err(error) = validate_workbook(&source.path) {
        return skip(FileStage::Discovered, error);
    }
    log_stage(&source.path, FileStage::Validated);

    let (readable, workspace) = match source.format {
        SourceFormat::Modern => (source.path.clone(), None),
        SourceFormat::Legacy => match normalize(source, converter, run_dir) {
            Ok((converted, workspace)) => (converted, Some(workspace)),
            Err(error) => return skip(FileStage::Validated, error),
        },
    };
    log_stage(&source.path, FileStage::Normalized);

    let workbook = match read_guarded(&readable, &source.path) {
        Ok(workbook) => workbook,
        Err(error) => return skip(FileStage::Normalized, error),
    };
    log_stage(&source.path, FileStage::Opened);

    Ingest::Ready {
        source: source.clone(),
        workbook,
        workspace,
    }
}

fn normalize(
    source: &SourceFile,
    converter: &dyn LegacyConverter,
    run_dir: &Path,
) -> Result<(PathBuf, TempDir)> {
    let workspace = tempfile::Builder::new()
        .prefix("legacy-")
        .tempdir_in(run_dir)
        .map_err(|error| ConsolidateError::normalization(&source.path, error))?;
    debug!(path = %source.path.display(), converter = converter.name(), "normalizing legacy workbook");
    // A converter may surface plain I/O errors; they only concern this file.
    let converted = converter
        .convert(&source.path, workspace.path())
        .map_err(|error| {
            if error.is_batch_fatal() {
                ConsolidateError::normalization(&source.path, error)
            } else {
                error
            }
        })?;
    Ok((converted, workspace))
}

fn read_guarded(readable: &Path, origin: &Path) -> Result<Workbook> {
    match panic::catch_unwind(AssertUnwindSafe(|| read_workbook(readable))) {
        Ok(Ok(workbook)) => Ok(workbook),
        Ok(Err(error)) => Err(ConsolidateError::open_failure(origin, error)),
        Err(_) => Err(ConsolidateError::open_failure(origin, "reader panicked")),
    }
}

fn log_stage(path: &Path, stage: FileStage) {
    debug!(path = %path.display(), stage = %stage, "file stage");
}

fn close_run_dir(run_dir: TempDir) {
    let location = run_dir.path().to_path_buf();
    if let Err(error) = run_dir.close() {
        warn!(path = %location.display(), error = %error, "failed to remove run directory");
    }
}
