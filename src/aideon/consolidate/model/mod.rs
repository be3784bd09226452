use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod reference;
pub mod style;

pub use reference::{CellRange, cell_name, column_letters};
pub use style::CellStyle;

use crate::aideon::consolidate::naming::SheetNameRegistry;

/// Container format of a discovered workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Binary BIFF workbook (`.xls`) that needs normalising first.
    Legacy,
    /// Office Open XML workbook (`.xlsx`, `.xlsm`).
    Modern,
}

impl SourceFormat {
    /// Detects the format from the file extension alone.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" => Some(SourceFormat::Modern),
            "xls" => Some(SourceFormat::Legacy),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Legacy => write!(f, "xls"),
            SourceFormat::Modern => write!(f, "xlsx"),
        }
    }
}

/// A workbook found by the directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: SourceFormat,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// File name used in diagnostics.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Value held by a cell. Formula cells carry their cached result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Serial date in the 1900 date system.
    Date(f64),
    /// Error result of a formula, kept as its display text (`#DIV/0!`).
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text used when comparing header rows.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(value) | CellValue::Date(value) => value.to_string(),
            CellValue::Text(value) | CellValue::Error(value) => value.clone(),
            CellValue::Bool(value) => value.to_string(),
        }
    }
}

/// Styling state of a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Styling {
    /// No explicit style; the host default applies.
    #[default]
    Default,
    /// Fully resolved style.
    Explicit(Box<CellStyle>),
    /// The cell references a style the source workbook does not define.
    Malformed { style_id: u32, reason: String },
}

impl Styling {
    pub fn explicit(&self) -> Option<&CellStyle> {
        match self {
            Styling::Explicit(style) => Some(style),
            _ => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Styling::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub styling: Styling,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            styling: Styling::Default,
        }
    }

    pub fn styled(value: CellValue, style: CellStyle) -> Self {
        Self {
            value,
            styling: Styling::Explicit(Box::new(style)),
        }
    }

    pub fn has_style(&self) -> bool {
        !self.styling.is_default()
    }
}

/// A named grid of cells with its explicit layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    pub name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    /// 1-based column → width in character units, only when set explicitly.
    pub column_widths: BTreeMap<u32, f64>,
    /// 1-based row → height in points, only when set explicitly.
    pub row_heights: BTreeMap<u32, f64>,
    pub merged_ranges: Vec<CellRange>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.cells.get(&(row, column))
    }

    pub fn set_cell(&mut self, row: u32, column: u32, cell: Cell) {
        self.cells.insert((row, column), cell);
    }

    /// Returns the cell at the coordinate, creating an empty unstyled one.
    pub fn cell_mut(&mut self, row: u32, column: u32) -> &mut Cell {
        self.cells.entry((row, column)).or_default()
    }

    pub fn write_value(&mut self, row: u32, column: u32, value: CellValue) -> &mut Cell {
        let cell = self.cell_mut(row, column);
        cell.value = value;
        cell
    }

    /// Populated cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> {
        self.cells.iter().map(|(position, cell)| (*position, cell))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Last populated row, 0 when the sheet is empty.
    pub fn max_row(&self) -> u32 {
        self.cells
            .keys()
            .next_back()
            .map(|(row, _)| *row)
            .unwrap_or(0)
    }

    /// Last populated column, 0 when the sheet is empty.
    pub fn max_column(&self) -> u32 {
        self.cells.keys().map(|(_, column)| *column).max().unwrap_or(0)
    }

    /// Dense view of one row across columns `1..=width`.
    pub fn row(&self, row: u32, width: u32) -> Vec<Option<&Cell>> {
        (1..=width).map(|column| self.cell(row, column)).collect()
    }
}

/// Ordered collection of uniquely named worksheets read from one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

/// The accumulating consolidation result.
///
/// The summary sheet, when present, always comes first; ordinary sheets keep
/// the order in which they were created.
#[derive(Debug)]
pub struct OutputWorkbook {
    summary: Option<Worksheet>,
    sheets: Vec<Worksheet>,
    names: SheetNameRegistry,
}

impl OutputWorkbook {
    /// Creates an empty output that keeps `summary_name` free for the
    /// consolidated summary sheet.
    pub fn new(summary_name: &str) -> Self {
        let mut names = SheetNameRegistry::default();
        names.claim(summary_name);
        Self {
            summary: None,
            sheets: Vec::new(),
            names,
        }
    }

    /// Appends a worksheet under a collision-free version of `candidate`.
    pub fn create_sheet(&mut self, candidate: &str) -> &mut Worksheet {
        let name = self.names.assign(candidate);
        self.sheets.push(Worksheet::new(name));
        let index = self.sheets.len() - 1;
        &mut self.sheets[index]
    }

    pub fn set_summary(&mut self, summary: Worksheet) {
        self.summary = Some(summary);
    }

    pub fn summary(&self) -> Option<&Worksheet> {
        self.summary.as_ref()
    }

    pub fn ordinary_sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// All sheets in output order.
    pub fn sheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.summary.iter().chain(self.sheets.iter())
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len() + usize::from(self.summary.is_some())
    }
}
