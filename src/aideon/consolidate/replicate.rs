use crate::aideon::consolidate::error::ConsolidateError;
use crate::aideon::consolidate::model::{OutputWorkbook, Worksheet};
use crate::aideon::consolidate::style::copy_cell;

/// Outcome of copying one ordinary sheet into the output.
#[derive(Debug, Default)]
pub struct ReplicationReport {
    pub source_name: String,
    /// Name the sheet received in the output, after collision handling.
    pub output_name: String,
    pub cells: usize,
    pub style_failures: Vec<ConsolidateError>,
}

impl ReplicationReport {
    pub fn renamed(&self) -> bool {
        self.source_name != self.output_name
    }
}

/// Appends a faithful copy of `source` to `output`: every populated cell
/// (value and style), explicit column widths and row heights, and merged
/// ranges.
///
/// A cell whose style cannot be copied keeps its value and is reported in
/// the returned [`ReplicationReport`]; the remaining cells are still copied.
pub fn replicate_sheet(source: &Worksheet, output: &mut OutputWorkbook) -> ReplicationReport {
    let target = output.create_sheet(&source.name);
    let mut report = ReplicationReport {
        source_name: source.name.clone(),
        output_name: target.name.clone(),
        ..ReplicationReport::default()
    };

    for (&column, &width) in &source.column_widths {
        target.column_widths.insert(column, width);
    }
    for (&row, &height) in &source.row_heights {
        target.row_heights.insert(row, height);
    }

    for ((row, column), cell) in source.cells() {
        if let Err(error) = copy_cell(cell, target, row, column) {
            report.style_failures.push(error);
        }
        report.cells += 1;
    }

    target
        .merged_ranges
        .extend(source.merged_ranges.iter().copied());

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aideon::consolidate::model::style::{CellStyle, FillPattern, Rgb};
    use crate::aideon::consolidate::model::{Cell, CellRange, CellValue, Styling};

    fn source_sheet() -> Worksheet {
        let mut sheet = Worksheet::new("Data");
        let mut header = CellStyle::default();
        header.font.bold = true;
        header.fill.pattern = FillPattern::Solid;
        header.fill.foreground = Some(Rgb(0xDDEBF7));
        sheet.set_cell(1, 1, Cell::styled(CellValue::Text("Name".into()), header.clone()));
        sheet.set_cell(1, 2, Cell::styled(CellValue::Empty, header));
        sheet.set_cell(2, 1, Cell::new(CellValue::Text("Ada".into())));
        sheet.set_cell(2, 2, Cell::new(CellValue::Number(36.0)));
        sheet.column_widths.insert(1, 24.0);
        sheet.row_heights.insert(1, 28.5);
        sheet.merged_ranges.push(CellRange::new(1, 1, 1, 2));
        sheet
    }

    #[test]
    fn copies_cells_dimensions_and_merges() {
        let source = source_sheet();
        let mut output = OutputWorkbook::new("总表");
        let report = replicate_sheet(&source, &mut output);

        assert_eq!(report.output_name, "Data");
        assert!(!report.renamed());
        assert_eq!(report.cells, 4);
        assert!(report.style_failures.is_empty());

        let copy = &output.ordinary_sheets()[0];
        assert_eq!(copy.cells().count(), source.cells().count());
        for ((row, column), cell) in source.cells() {
            assert_eq!(copy.cell(row, column), Some(cell));
        }
        assert_eq!(copy.column_widths, source.column_widths);
        assert_eq!(copy.row_heights, source.row_heights);
        assert_eq!(copy.merged_ranges, source.merged_ranges);
    }

    #[test]
    fn colliding_names_are_suffixed() {
        let source = source_sheet();
        let mut output = OutputWorkbook::new("总表");
        replicate_sheet(&source, &mut output);
        let second = replicate_sheet(&source, &mut output);
        assert_eq!(second.output_name, "Data_1");
        assert!(second.renamed());
        assert_eq!(output.sheet_names(), vec!["Data", "Data_1"]);
    }

    #[test]
    fn style_failures_are_reported_and_copying_continues() {
        let mut source = source_sheet();
        source.set_cell(
            3,
            1,
            Cell {
                value: CellValue::Number(1.0),
                styling: Styling::Malformed {
                    style_id: 9,
                    reason: "cellXfs defines 2 entries".into(),
                },
            },
        );
        source.set_cell(4, 1, Cell::new(CellValue::Text("after".into())));

        let mut output = OutputWorkbook::new("总表");
        let report = replicate_sheet(&source, &mut output);
        assert_eq!(report.style_failures.len(), 1);
        let copy = &output.ordinary_sheets()[0];
        assert_eq!(copy.cell(3, 1).map(|cell| &cell.value), Some(&CellValue::Number(1.0)));
        assert_eq!(
            copy.cell(4, 1).map(|cell| &cell.value),
            Some(&CellValue::Text("after".into()))
        );
    }
}
