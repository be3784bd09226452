use std::fs;
use std::path::Path;

use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatDiagonalBorder, FormatPattern, FormatScript,
    FormatUnderline, Workbook, XlsxError,
};
use tracing::{debug, warn};

use crate::aideon::consolidate::error::Result;
use crate::aideon::consolidate::model::style::{
    BorderEdge, BorderLine, CellStyle, FillPattern, FontScript, HorizontalAlign, Rgb, Underline,
    VerticalAlign,
};
use crate::aideon::consolidate::model::{Cell, CellValue, OutputWorkbook, Worksheet, cell_name};

/// Number format given to dates that carry no style of their own.
const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd";

/// Counters describing what [`write_workbook`] persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub sheets: usize,
    pub cells: usize,
    pub skipped_cells: usize,
    pub skipped_merges: usize,
}

/// Persists the output workbook, replacing any existing file at `path`.
///
/// Cells and merges the writer rejects are logged and skipped; failing to
/// create the destination directory or to save is an error.
pub fn write_workbook(path: &Path, output: &OutputWorkbook) -> Result<WriteStats> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut workbook_writer = Workbook::new();
    let mut stats = WriteStats::default();

    for sheet in output.sheets() {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        render_sheet(worksheet, sheet, &mut stats)?;
        stats.sheets += 1;
    }

    workbook_writer.save(path)?;
    debug!(path = %path.display(), sheets = stats.sheets, cells = stats.cells, "workbook saved");
    Ok(stats)
}

fn render_sheet(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    sheet: &Worksheet,
    stats: &mut WriteStats,
) -> Result<()> {
    for (&column, &width) in &sheet.column_widths {
        worksheet.set_column_width_pixels((column - 1) as u16, width_to_pixels(width))?;
    }
    for (&row, &height) in &sheet.row_heights {
        worksheet.set_row_height(row - 1, height)?;
    }

    // Merges go first: merge_range writes the anchor, and the cell pass below
    // puts the real anchor value back.
    for range in &sheet.merged_ranges {
        if range.is_single_cell() {
            continue;
        }
        let format = sheet
            .cell(range.first_row, range.first_column)
            .and_then(|cell| cell.styling.explicit())
            .map(build_format)
            .unwrap_or_else(Format::new);
        let merged = worksheet.merge_range(
            range.first_row - 1,
            (range.first_column - 1) as u16,
            range.last_row - 1,
            (range.last_column - 1) as u16,
            "",
            &format,
        );
        if let Err(error) = merged {
            warn!(sheet = %sheet.name, range = %range, error = %error, "skipping merged range");
            stats.skipped_merges += 1;
        }
    }

    for ((row, column), cell) in sheet.cells() {
        match write_cell(worksheet, row - 1, (column - 1) as u16, cell) {
            Ok(true) => stats.cells += 1,
            Ok(false) => {}
            Err(error) => {
                warn!(
                    sheet = %sheet.name,
                    cell = %cell_name(row, column),
                    error = %error,
                    "skipping cell the writer rejected"
                );
                stats.skipped_cells += 1;
            }
        }
    }
    Ok(())
}

/// Writes one cell; returns whether anything was written.
fn write_cell(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    column: u16,
    cell: &Cell,
) -> std::result::Result<bool, XlsxError> {
    let format = cell.styling.explicit().map(build_format);
    match (&cell.value, format) {
        (CellValue::Empty, None) => return Ok(false),
        (CellValue::Empty, Some(format)) => {
            worksheet.write_blank(row, column, &format)?;
        }
        (CellValue::Number(number), Some(format)) => {
            worksheet.write_number_with_format(row, column, *number, &format)?;
        }
        (CellValue::Number(number), None) => {
            worksheet.write_number(row, column, *number)?;
        }
        (CellValue::Date(serial), format) => {
            let format =
                format.unwrap_or_else(|| Format::new().set_num_format(DEFAULT_DATE_FORMAT));
            worksheet.write_number_with_format(row, column, *serial, &format)?;
        }
        (CellValue::Text(text) | CellValue::Error(text), Some(format)) => {
            worksheet.write_string_with_format(row, column, text.as_str(), &format)?;
        }
        (CellValue::Text(text) | CellValue::Error(text), None) => {
            worksheet.write_string(row, column, text.as_str())?;
        }
        (CellValue::Bool(flag), Some(format)) => {
            worksheet.write_boolean_with_format(row, column, *flag, &format)?;
        }
        (CellValue::Bool(flag), None) => {
            worksheet.write_boolean(row, column, *flag)?;
        }
    }
    Ok(true)
}

/// Converts a stored column width (character units) to the pixel width
/// Excel renders for it with the default font.
pub fn width_to_pixels(width: f64) -> u16 {
    if width <= 0.0 {
        return 0;
    }
    let pixels = ((256.0 * width + (128.0_f64 / 7.0).trunc()) / 256.0 * 7.0).trunc();
    pixels.min(f64::from(u16::MAX)) as u16
}

/// Converts an OOXML `textRotation` into the writer's signed degrees.
fn rotation_degrees(rotation: u16) -> i16 {
    match rotation {
        0..=90 => rotation as i16,
        91..=180 => 90 - rotation as i16,
        _ => 270,
    }
}

/// Builds a writer format that reproduces `style` field by field.
pub fn build_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    let font = &style.font;
    if let Some(name) = &font.name {
        format = format.set_font_name(name);
    }
    if let Some(size) = font.size {
        format = format.set_font_size(size);
    }
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if let Some(underline) = map_underline(font.underline) {
        format = format.set_underline(underline);
    }
    if font.strikethrough {
        format = format.set_font_strikethrough();
    }
    if let Some(color) = font.color {
        format = format.set_font_color(color_of(color));
    }
    match font.script {
        FontScript::Baseline => {}
        FontScript::Superscript => format = format.set_font_script(FormatScript::Superscript),
        FontScript::Subscript => format = format.set_font_script(FormatScript::Subscript),
    }

    format = apply_borders(format, style);

    let fill = &style.fill;
    match fill.pattern {
        FillPattern::None => {}
        FillPattern::Solid => {
            format = format.set_pattern(FormatPattern::Solid);
            if let Some(color) = fill.foreground.or(fill.background) {
                format = format.set_background_color(color_of(color));
            }
        }
        pattern => {
            format = format.set_pattern(map_pattern(pattern));
            if let Some(color) = fill.foreground {
                format = format.set_foreground_color(color_of(color));
            }
            if let Some(color) = fill.background {
                format = format.set_background_color(color_of(color));
            }
        }
    }

    let number_format = &style.number_format;
    if !number_format.is_general() {
        format = match u8::try_from(number_format.id) {
            Ok(index) if number_format.is_builtin() => format.set_num_format_index(index),
            _ => format.set_num_format(&number_format.code),
        };
    }

    if !style.protection.locked {
        format = format.set_unlocked();
    }
    if style.protection.hidden {
        format = format.set_hidden();
    }

    let alignment = &style.alignment;
    if let Some(align) = map_horizontal(alignment.horizontal) {
        format = format.set_align(align);
    }
    if let Some(align) = map_vertical(alignment.vertical) {
        format = format.set_align(align);
    }
    if alignment.wrap_text {
        format = format.set_text_wrap();
    }
    if alignment.shrink_to_fit {
        format = format.set_shrink();
    }
    if alignment.indent > 0 {
        format = format.set_indent(alignment.indent);
    }
    if alignment.rotation != 0 {
        format = format.set_rotation(rotation_degrees(alignment.rotation));
    }

    format
}

fn apply_borders(mut format: Format, style: &CellStyle) -> Format {
    let border = &style.border;
    if let Some((line, color)) = edge_parts(&border.left) {
        format = format.set_border_left(line);
        if let Some(color) = color {
            format = format.set_border_left_color(color);
        }
    }
    if let Some((line, color)) = edge_parts(&border.right) {
        format = format.set_border_right(line);
        if let Some(color) = color {
            format = format.set_border_right_color(color);
        }
    }
    if let Some((line, color)) = edge_parts(&border.top) {
        format = format.set_border_top(line);
        if let Some(color) = color {
            format = format.set_border_top_color(color);
        }
    }
    if let Some((line, color)) = edge_parts(&border.bottom) {
        format = format.set_border_bottom(line);
        if let Some(color) = color {
            format = format.set_border_bottom_color(color);
        }
    }

    let diagonal_type = match (border.diagonal_up, border.diagonal_down) {
        (true, true) => Some(FormatDiagonalBorder::BorderUpDown),
        (true, false) => Some(FormatDiagonalBorder::BorderUp),
        (false, true) => Some(FormatDiagonalBorder::BorderDown),
        (false, false) => None,
    };
    if let (Some(diagonal_type), true) = (diagonal_type, border.diagonal.is_visible()) {
        format = format
            .set_border_diagonal(map_border(border.diagonal.line))
            .set_border_diagonal_type(diagonal_type);
        if let Some(color) = border.diagonal.color {
            format = format.set_border_diagonal_color(color_of(color));
        }
    }
    format
}

fn edge_parts(edge: &BorderEdge) -> Option<(FormatBorder, Option<Color>)> {
    edge.is_visible()
        .then(|| (map_border(edge.line), edge.color.map(color_of)))
}

fn color_of(color: Rgb) -> Color {
    Color::RGB(color.0)
}

fn map_underline(underline: Underline) -> Option<FormatUnderline> {
    match underline {
        Underline::None => None,
        Underline::Single => Some(FormatUnderline::Single),
        Underline::Double => Some(FormatUnderline::Double),
        Underline::SingleAccounting => Some(FormatUnderline::SingleAccounting),
        Underline::DoubleAccounting => Some(FormatUnderline::DoubleAccounting),
    }
}

fn map_border(line: BorderLine) -> FormatBorder {
    match line {
        BorderLine::None => FormatBorder::None,
        BorderLine::Thin => FormatBorder::Thin,
        BorderLine::Medium => FormatBorder::Medium,
        BorderLine::Dashed => FormatBorder::Dashed,
        BorderLine::Dotted => FormatBorder::Dotted,
        BorderLine::Thick => FormatBorder::Thick,
        BorderLine::Double => FormatBorder::Double,
        BorderLine::Hair => FormatBorder::Hair,
        BorderLine::MediumDashed => FormatBorder::MediumDashed,
        BorderLine::DashDot => FormatBorder::DashDot,
        BorderLine::MediumDashDot => FormatBorder::MediumDashDot,
        BorderLine::DashDotDot => FormatBorder::DashDotDot,
        BorderLine::MediumDashDotDot => FormatBorder::MediumDashDotDot,
        BorderLine::SlantDashDot => FormatBorder::SlantDashDot,
    }
}

fn map_pattern(pattern: FillPattern) -> FormatPattern {
    match pattern {
        FillPattern::None => FormatPattern::None,
        FillPattern::Solid => FormatPattern::Solid,
        FillPattern::MediumGray => FormatPattern::MediumGray,
        FillPattern::DarkGray => FormatPattern::DarkGray,
        FillPattern::LightGray => FormatPattern::LightGray,
        FillPattern::DarkHorizontal => FormatPattern::DarkHorizontal,
        FillPattern::DarkVertical => FormatPattern::DarkVertical,
        FillPattern::DarkDown => FormatPattern::DarkDown,
        FillPattern::DarkUp => FormatPattern::DarkUp,
        FillPattern::DarkGrid => FormatPattern::DarkGrid,
        FillPattern::DarkTrellis => FormatPattern::DarkTrellis,
        FillPattern::LightHorizontal => FormatPattern::LightHorizontal,
        FillPattern::LightVertical => FormatPattern::LightVertical,
        FillPattern::LightDown => FormatPattern::LightDown,
        FillPattern::LightUp => FormatPattern::LightUp,
        FillPattern::LightGrid => FormatPattern::LightGrid,
        FillPattern::LightTrellis => FormatPattern::LightTrellis,
        FillPattern::Gray125 => FormatPattern::Gray125,
        FillPattern::Gray0625 => FormatPattern::Gray0625,
    }
}

fn map_horizontal(align: HorizontalAlign) -> Option<FormatAlign> {
    match align {
        HorizontalAlign::General => None,
        HorizontalAlign::Left => Some(FormatAlign::Left),
        HorizontalAlign::Center => Some(FormatAlign::Center),
        HorizontalAlign::Right => Some(FormatAlign::Right),
        HorizontalAlign::Fill => Some(FormatAlign::Fill),
        HorizontalAlign::Justify => Some(FormatAlign::Justify),
        HorizontalAlign::CenterContinuous => Some(FormatAlign::CenterAcross),
        HorizontalAlign::Distributed => Some(FormatAlign::Distributed),
    }
}

fn map_vertical(align: VerticalAlign) -> Option<FormatAlign> {
    match align {
        VerticalAlign::Bottom => None,
        VerticalAlign::Top => Some(FormatAlign::Top),
        VerticalAlign::Center => Some(FormatAlign::VerticalCenter),
        VerticalAlign::Justify => Some(FormatAlign::VerticalJustify),
        VerticalAlign::Distributed => Some(FormatAlign::VerticalDistributed),
    }
}
