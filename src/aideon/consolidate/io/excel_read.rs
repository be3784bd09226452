use std::io::{Read, Seek};
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::aideon::consolidate::error::{ConsolidateError, Result};
use crate::aideon::consolidate::io::package::{PackageLayout, SheetLayout, read_package};
use crate::aideon::consolidate::model::{Cell, CellValue, Workbook, Worksheet};

/// Reads every worksheet of a modern workbook: values through calamine,
/// styles and layout through the package reader.
///
/// The workbook handle is released before this returns.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let layout = read_package(path)?;
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let mut sheets = Vec::with_capacity(layout.sheets.len());
    for sheet_layout in &layout.sheets {
        let range = read_sheet_range(&mut workbook, &sheet_layout.name)?;
        let sheet = build_sheet(&range, sheet_layout, &layout);
        debug!(
            path = %path.display(),
            sheet = %sheet.name,
            cells = sheet.cell_count(),
            merges = sheet.merged_ranges.len(),
            "read worksheet"
        );
        sheets.push(sheet);
    }

    Ok(Workbook { sheets })
}

fn read_sheet_range<R: Read + Seek>(workbook: &mut Xlsx<R>, name: &str) -> Result<Range<DataType>> {
    let range = workbook
        .worksheet_range(name)
        .ok_or_else(|| ConsolidateError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    Ok(range?)
}

fn build_sheet(range: &Range<DataType>, sheet_layout: &SheetLayout, layout: &PackageLayout) -> Worksheet {
    let mut sheet = Worksheet::new(sheet_layout.name.clone());

    if let Some((start_row, start_column)) = range.start() {
        for (row, column, value) in range.used_cells() {
            let value = to_cell_value(value);
            if value.is_empty() {
                continue;
            }
            sheet.set_cell(
                start_row + row as u32 + 1,
                start_column + column as u32 + 1,
                Cell::new(value),
            );
        }
    }

    for (&(row, column), &style_id) in &sheet_layout.style_ids {
        sheet.cell_mut(row, column).styling = layout.styles.styling_for(Some(style_id));
    }

    sheet.merged_ranges = sheet_layout.merged_ranges.clone();

    // Dimensions are carried for the used area only.
    let last_row = sheet_layout
        .merged_ranges
        .iter()
        .map(|range| range.last_row)
        .fold(sheet.max_row(), u32::max);
    let last_column = sheet_layout
        .merged_ranges
        .iter()
        .map(|range| range.last_column)
        .fold(sheet.max_column(), u32::max);
    sheet.column_widths = sheet_layout
        .column_widths
        .range(..=last_column)
        .map(|(column, width)| (*column, *width))
        .collect();
    sheet.row_heights = sheet_layout
        .row_heights
        .range(..=last_row)
        .map(|(row, height)| (*row, *height))
        .collect();

    sheet
}

/// calamine already reports 1904-system serials in the 1900 system.
fn to_cell_value(value: &DataType) -> CellValue {
    match value {
        DataType::Empty => CellValue::Empty,
        DataType::Int(number) => CellValue::Number(*number as f64),
        DataType::Float(number) => CellValue::Number(*number),
        DataType::String(text) => CellValue::Text(text.clone()),
        DataType::Bool(flag) => CellValue::Bool(*flag),
        DataType::DateTime(serial) => CellValue::Date(*serial),
        DataType::Error(error) => CellValue::Error(error.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Rewrites `xl/workbook.xml` of `source` into `target` with the 1904
    /// date system switched on.
    fn switch_to_1904(source: &Path, target: &Path) {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(source).unwrap()).unwrap();
        let mut writer = zip::ZipWriter::new(std::fs::File::create(target).unwrap());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).unwrap();
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            if name == "xl/workbook.xml" {
                let xml = String::from_utf8(data).unwrap();
                assert!(xml.contains("<workbookPr"));
                data = xml
                    .replacen("<workbookPr", "<workbookPr date1904=\"1\"", 1)
                    .into_bytes();
            }
            writer
                .start_file(name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn dates_from_1904_workbooks_come_back_in_the_1900_system() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.xlsx");
        let shifted = dir.path().join("shifted.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Data").unwrap();
        let date_format = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_number_with_format(0, 0, 100.0, &date_format).unwrap();
        workbook.save(&plain).unwrap();
        switch_to_1904(&plain, &shifted);

        let plain = read_workbook(&plain).unwrap();
        assert_eq!(
            plain.sheets[0].cell(1, 1).map(|cell| &cell.value),
            Some(&CellValue::Date(100.0))
        );
        let shifted = read_workbook(&shifted).unwrap();
        assert_eq!(
            shifted.sheets[0].cell(1, 1).map(|cell| &cell.value),
            Some(&CellValue::Date(100.0 + 1462.0))
        );
    }

    #[test]
    fn scalar_values_map_directly() {
        assert_eq!(to_cell_value(&DataType::Int(7)), CellValue::Number(7.0));
        assert_eq!(
            to_cell_value(&DataType::String("x".into())),
            CellValue::Text("x".into())
        );
        assert_eq!(to_cell_value(&DataType::Bool(true)), CellValue::Bool(true));
        assert_eq!(
            to_cell_value(&DataType::Error(calamine::CellErrorType::Div0)),
            CellValue::Error("#DIV/0!".into())
        );
    }
}
