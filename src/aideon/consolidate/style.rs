use thiserror::Error;

use crate::aideon::consolidate::error::ConsolidateError;
use crate::aideon::consolidate::model::{Cell, Styling, Worksheet, cell_name};

/// Raised when a source cell references a style that cannot be copied.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("style #{style_id} is unusable: {reason}")]
pub struct StyleTransferError {
    pub style_id: u32,
    pub reason: String,
}

impl StyleTransferError {
    /// Attaches the target location, producing the crate-level diagnostic.
    pub fn at(self, sheet: &str, row: u32, column: u32) -> ConsolidateError {
        ConsolidateError::StyleCopyFailure {
            sheet: sheet.to_string(),
            cell: cell_name(row, column),
            reason: self.to_string(),
        }
    }
}

/// Copies the style of `source` onto `target`.
///
/// Font, border, fill, number format, protection, and alignment are each
/// copied as owned values. An unstyled source leaves `target` untouched.
pub fn transfer_style(source: &Cell, target: &mut Cell) -> Result<(), StyleTransferError> {
    match &source.styling {
        Styling::Default => Ok(()),
        Styling::Malformed { style_id, reason } => Err(StyleTransferError {
            style_id: *style_id,
            reason: reason.clone(),
        }),
        Styling::Explicit(style) => {
            let mut copy = target.styling.explicit().cloned().unwrap_or_default();
            copy.font = style.font.clone();
            copy.border = style.border;
            copy.fill = style.fill;
            copy.number_format = style.number_format.clone();
            copy.protection = style.protection;
            copy.alignment = style.alignment;
            target.styling = Styling::Explicit(Box::new(copy));
            Ok(())
        }
    }
}

/// Writes `source`'s value at `(row, column)` of `sheet`, then copies its
/// style. The value is written even when the style copy fails.
pub fn copy_cell(
    source: &Cell,
    sheet: &mut Worksheet,
    row: u32,
    column: u32,
) -> Result<(), ConsolidateError> {
    let sheet_name = sheet.name.clone();
    let target = sheet.write_value(row, column, source.value.clone());
    transfer_style(source, target).map_err(|error| error.at(&sheet_name, row, column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aideon::consolidate::model::CellValue;
    use crate::aideon::consolidate::model::style::{
        BorderLine, CellStyle, FillPattern, HorizontalAlign, Rgb,
    };

    fn sample_style() -> CellStyle {
        let mut style = CellStyle::default();
        style.font.bold = true;
        style.font.color = Some(Rgb(0xC00000));
        style.border.bottom.line = BorderLine::Double;
        style.fill.pattern = FillPattern::Solid;
        style.fill.foreground = Some(Rgb(0xFFFF00));
        style.number_format.id = 14;
        style.number_format.code = "m/d/yyyy".into();
        style.protection.locked = false;
        style.alignment.horizontal = HorizontalAlign::Center;
        style
    }

    #[test]
    fn explicit_style_is_copied_field_for_field() {
        let source = Cell::styled(CellValue::Number(3.0), sample_style());
        let mut target = Cell::new(CellValue::Number(3.0));
        transfer_style(&source, &mut target).unwrap();
        let copied = target.styling.explicit().unwrap();
        let original = source.styling.explicit().unwrap();
        assert_eq!(copied.font, original.font);
        assert_eq!(copied.border, original.border);
        assert_eq!(copied.fill, original.fill);
        assert_eq!(copied.number_format, original.number_format);
        assert_eq!(copied.protection, original.protection);
        assert_eq!(copied.alignment, original.alignment);
    }

    #[test]
    fn unstyled_source_leaves_target_default() {
        let source = Cell::new(CellValue::Text("plain".into()));
        let mut target = Cell::default();
        transfer_style(&source, &mut target).unwrap();
        assert!(target.styling.is_default());
    }

    #[test]
    fn transfer_is_idempotent() {
        let source = Cell::styled(CellValue::Bool(true), sample_style());
        let mut once = Cell::default();
        transfer_style(&source, &mut once).unwrap();
        let mut twice = Cell::default();
        transfer_style(&source, &mut twice).unwrap();
        transfer_style(&source, &mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn copies_do_not_alias() {
        let source = Cell::styled(CellValue::Empty, sample_style());
        let mut target = Cell::default();
        transfer_style(&source, &mut target).unwrap();
        if let Styling::Explicit(style) = &mut target.styling {
            style.font.bold = false;
            style.fill.foreground = None;
        }
        let original = source.styling.explicit().unwrap();
        assert!(original.font.bold);
        assert_eq!(original.fill.foreground, Some(Rgb(0xFFFF00)));
    }

    #[test]
    fn malformed_style_reports_location_but_keeps_value() {
        let source = Cell {
            value: CellValue::Text("kept".into()),
            styling: Styling::Malformed {
                style_id: 42,
                reason: "cellXfs has 3 entries".into(),
            },
        };
        let mut sheet = Worksheet::new("Data");
        let error = copy_cell(&source, &mut sheet, 2, 3).unwrap_err();
        match error {
            ConsolidateError::StyleCopyFailure { sheet, cell, reason } => {
                assert_eq!(sheet, "Data");
                assert_eq!(cell, "C2");
                assert!(reason.contains("#42"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let written = sheet.cell(2, 3).unwrap();
        assert_eq!(written.value, CellValue::Text("kept".into()));
        assert!(written.styling.is_default());
    }
}
