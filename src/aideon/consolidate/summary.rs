//! Aggregation of the designated summary sheets of every source workbook into
//! one consolidated sheet: a single header row followed by every data row in
//! enumeration order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::aideon::consolidate::config::HeaderPolicy;
use crate::aideon::consolidate::error::ConsolidateError;
use crate::aideon::consolidate::model::reference::MAX_ROW;
use crate::aideon::consolidate::model::{Cell, Worksheet};
use crate::aideon::consolidate::style::copy_cell;

/// One data row taken from a contributing summary sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub origin: PathBuf,
    pub source_row: u32,
    /// Columns `1..=n` of the source row; `None` where the source had no cell.
    pub cells: Vec<Option<Cell>>,
}

/// Header plus concatenated data rows of every contributing summary sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedSummary {
    pub header: Vec<Option<Cell>>,
    pub header_origin: PathBuf,
    /// Column widths of the sheet that supplied the header.
    pub column_widths: BTreeMap<u32, f64>,
    pub rows: Vec<SummaryRow>,
    /// Files whose rows made it into the summary, in order.
    pub contributors: Vec<PathBuf>,
    /// Files whose header differed from the canonical one.
    pub mismatched: Vec<PathBuf>,
    /// Files left out because their header differed under
    /// [`HeaderPolicy::Strict`].
    pub rejected: Vec<PathBuf>,
}

impl ConsolidatedSummary {
    /// Rows the consolidated sheet spans, header included.
    pub fn row_count(&self) -> usize {
        1 + self.rows.len()
    }
}

/// Incrementally folds summary sheets, in enumeration order, into a
/// [`ConsolidatedSummary`].
#[derive(Debug)]
pub struct SummaryAggregator {
    policy: HeaderPolicy,
    summary: Option<ConsolidatedSummary>,
    header_key: Vec<String>,
}

impl SummaryAggregator {
    pub fn new(policy: HeaderPolicy) -> Self {
        Self {
            policy,
            summary: None,
            header_key: Vec::new(),
        }
    }

    /// Adds the summary sheet read from `origin`.
    ///
    /// The first non-empty sheet supplies the header; every sheet
    /// contributes its rows from row 2 through its last used row.
    pub fn push(&mut self, origin: &Path, sheet: &Worksheet) {
        let last_row = sheet.max_row();
        if last_row == 0 {
            debug!(origin = %origin.display(), "summary sheet is empty");
            return;
        }
        let width = sheet.max_column();
        let header = owned_row(sheet, 1, width);
        let key = header_key(&header);

        match &mut self.summary {
            None => {
                self.header_key = key;
                self.summary = Some(ConsolidatedSummary {
                    header,
                    header_origin: origin.to_path_buf(),
                    column_widths: sheet.column_widths.clone(),
                    rows: Vec::new(),
                    contributors: Vec::new(),
                    mismatched: Vec::new(),
                    rejected: Vec::new(),
                });
            }
            Some(summary) if key != self.header_key => {
                summary.mismatched.push(origin.to_path_buf());
                match self.policy {
                    HeaderPolicy::Append => {
                        warn!(
                            origin = %origin.display(),
                            header_from = %summary.header_origin.display(),
                            "summary header differs; appending rows anyway"
                        );
                    }
                    HeaderPolicy::Strict => {
                        warn!(
                            origin = %origin.display(),
                            header_from = %summary.header_origin.display(),
                            "summary header differs; leaving rows out"
                        );
                        summary.rejected.push(origin.to_path_buf());
                        return;
                    }
                }
            }
            Some(_) => {}
        }

        let Some(summary) = self.summary.as_mut() else {
            return;
        };
        for row in 2..=last_row {
            summary.rows.push(SummaryRow {
                origin: origin.to_path_buf(),
                source_row: row,
                cells: owned_row(sheet, row, width),
            });
        }
        summary.contributors.push(origin.to_path_buf());
        debug!(
            origin = %origin.display(),
            rows = last_row - 1,
            total = summary.rows.len(),
            "summary rows appended"
        );
    }

    /// `None` when no non-empty summary sheet was seen.
    pub fn finish(self) -> Option<ConsolidatedSummary> {
        self.summary
    }
}

/// Aggregates an ordered list of `(origin, summary sheet)` pairs.
pub fn aggregate<'a, I>(sheets: I, policy: HeaderPolicy) -> Option<ConsolidatedSummary>
where
    I: IntoIterator<Item = (&'a Path, &'a Worksheet)>,
{
    let mut aggregator = SummaryAggregator::new(policy);
    for (origin, sheet) in sheets {
        aggregator.push(origin, sheet);
    }
    aggregator.finish()
}

/// A summary cell whose style could not be copied, with the file it came
/// from.
#[derive(Debug)]
pub struct SummaryStyleFailure {
    pub origin: PathBuf,
    pub error: ConsolidateError,
}

/// Renders the summary as a worksheet named `name`, copying every cell's
/// value and style. Style failures are returned, not fatal.
pub fn materialize(
    summary: &ConsolidatedSummary,
    name: &str,
) -> (Worksheet, Vec<SummaryStyleFailure>) {
    let mut sheet = Worksheet::new(name);
    let mut failures = Vec::new();
    sheet.column_widths = summary.column_widths.clone();

    let mut write_row = |sheet: &mut Worksheet, origin: &Path, row: u32, cells: &[Option<Cell>]| {
        for (index, cell) in cells.iter().enumerate() {
            let Some(cell) = cell else {
                continue;
            };
            if let Err(error) = copy_cell(cell, sheet, row, index as u32 + 1) {
                failures.push(SummaryStyleFailure {
                    origin: origin.to_path_buf(),
                    error,
                });
            }
        }
    };

    write_row(&mut sheet, &summary.header_origin, 1, &summary.header);
    let capacity = (MAX_ROW - 1) as usize;
    if summary.rows.len() > capacity {
        warn!(
            rows = summary.rows.len(),
            kept = capacity,
            "summary exceeds the worksheet row limit; truncating"
        );
    }
    for (offset, row) in summary.rows.iter().take(capacity).enumerate() {
        write_row(&mut sheet, &row.origin, offset as u32 + 2, &row.cells);
    }

    (sheet, failures)
}

fn owned_row(sheet: &Worksheet, row: u32, width: u32) -> Vec<Option<Cell>> {
    sheet.row(row, width).into_iter().map(|cell| cell.cloned()).collect()
}

/// Comparable form of a header: trimmed text, trailing blanks dropped.
fn header_key(header: &[Option<Cell>]) -> Vec<String> {
    let mut key: Vec<String> = header
        .iter()
        .map(|cell| {
            cell.as_ref()
                .map(|cell| cell.value.as_text().trim().to_string())
                .unwrap_or_default()
        })
        .collect();
    while key.last().is_some_and(String::is_empty) {
        key.pop();
    }
    key
}
