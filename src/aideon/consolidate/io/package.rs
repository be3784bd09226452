//! Reads the parts of an xlsx package that cell-value readers do not expose:
//! sheet-to-part mapping, the date system, per-cell style indices, explicit
//! column widths and row heights, and merged ranges.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use zip::ZipArchive;

use crate::aideon::consolidate::error::{ConsolidateError, Result};
use crate::aideon::consolidate::io::styles::{ColorContext, StyleTable};
use crate::aideon::consolidate::io::xml::{
    attr, attr_f64, attr_u32, read_part, resolve_target,
};
use crate::aideon::consolidate::model::reference::{CellRange, MAX_COLUMN, parse_cell};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const WORKSHEET_REL_SUFFIX: &str = "/worksheet";
const STYLES_REL_SUFFIX: &str = "/styles";
const THEME_REL_SUFFIX: &str = "/theme";

/// Layout facts about one worksheet part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    /// `(row, column)` → non-default `cellXfs` index.
    pub style_ids: BTreeMap<(u32, u32), u32>,
    pub column_widths: BTreeMap<u32, f64>,
    pub row_heights: BTreeMap<u32, f64>,
    pub merged_ranges: Vec<CellRange>,
}

/// Everything the package contributes beyond cell values.
#[derive(Debug, Clone, Default)]
pub struct PackageLayout {
    pub sheets: Vec<SheetLayout>,
    pub styles: StyleTable,
}

#[derive(Debug, Clone)]
struct Relationship {
    target: String,
    kind: String,
}

/// Opens the xlsx at `path` and reads its layout.
pub fn read_package(path: &Path) -> Result<PackageLayout> {
    let file = BufReader::new(File::open(path)?);
    let mut archive = ZipArchive::new(file)?;
    read_package_from(&mut archive)
}

pub fn read_package_from<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<PackageLayout> {
    let workbook_xml = read_part(archive, WORKBOOK_PART)?
        .ok_or_else(|| ConsolidateError::InvalidWorkbook(format!("missing {WORKBOOK_PART}")))?;
    let declared = parse_workbook(&workbook_xml)?;
    let relationships = match read_part(archive, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let part_of = |suffix: &str| {
        relationships
            .values()
            .find(|rel| rel.kind.ends_with(suffix))
            .map(|rel| resolve_target("xl", &rel.target))
    };
    let styles_part = part_of(STYLES_REL_SUFFIX).unwrap_or_else(|| "xl/styles.xml".to_string());
    let theme_part = part_of(THEME_REL_SUFFIX);

    let styles_xml = read_part(archive, &styles_part)?;
    let theme_xml = match theme_part {
        Some(part) => read_part(archive, &part)?,
        None => None,
    };
    let colors = ColorContext::from_parts(theme_xml.as_deref(), styles_xml.as_deref())?;
    let styles = match styles_xml.as_deref() {
        Some(xml) => StyleTable::parse(xml, &colors)?,
        None => StyleTable::default(),
    };

    let mut sheets = Vec::with_capacity(declared.len());
    for (name, relationship_id) in declared {
        let Some(relationship) = relationships.get(&relationship_id) else {
            return Err(ConsolidateError::InvalidWorkbook(format!(
                "sheet '{name}' references unknown relationship {relationship_id}"
            )));
        };
        if !relationship.kind.ends_with(WORKSHEET_REL_SUFFIX) {
            debug!(sheet = %name, kind = %relationship.kind, "skipping non-worksheet sheet");
            continue;
        }
        let part = resolve_target("xl", &relationship.target);
        let xml = read_part(archive, &part)?.ok_or_else(|| {
            ConsolidateError::InvalidWorkbook(format!("sheet '{name}' part {part} is missing"))
        })?;
        let mut layout = parse_worksheet(&xml)?;
        layout.name = name;
        sheets.push(layout);
    }

    if styles.is_empty() {
        debug!("package has no cell formats; every cell uses the default style");
    }
    debug!(sheets = sheets.len(), cell_formats = styles.len(), "package layout read");
    Ok(PackageLayout { sheets, styles })
}

/// Returns the declared `(name, r:id)` sheet list.
fn parse_workbook(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element) => match element.local_name().as_ref() {
                b"sheet" => {
                    if let (Some(name), Some(id)) = (attr(&element, b"name"), attr(&element, b"id"))
                    {
                        sheets.push((name, id));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(&element, b"Id"), attr(&element, b"Target"))
                {
                    let kind = attr(&element, b"Type").unwrap_or_default();
                    relationships.insert(id, Relationship { target, kind });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(relationships)
}

/// Collects style indices, dimensions, and merges from a worksheet part.
/// Cell values are skipped.
fn parse_worksheet(xml: &[u8]) -> Result<SheetLayout> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut layout = SheetLayout::default();
    let mut row: u32 = 0;
    let mut column: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element) => match element.local_name().as_ref() {
                b"row" => {
                    row = attr_u32(&element, b"r").unwrap_or(row + 1);
                    column = 0;
                    if let Some(height) = attr_f64(&element, b"ht") {
                        layout.row_heights.insert(row, height);
                    }
                }
                b"c" => {
                    let position = attr(&element, b"r").and_then(|r| parse_cell(&r));
                    let (cell_row, cell_column) = position.unwrap_or((row, column + 1));
                    row = cell_row;
                    column = cell_column;
                    if let Some(style_id) = attr_u32(&element, b"s").filter(|id| *id != 0) {
                        layout.style_ids.insert((cell_row, cell_column), style_id);
                    }
                }
                b"col" => {
                    let width = attr_f64(&element, b"width");
                    let min = attr_u32(&element, b"min");
                    let max = attr_u32(&element, b"max");
                    if let (Some(width), Some(min), Some(max)) = (width, min, max) {
                        for index in min.max(1)..=max.min(MAX_COLUMN) {
                            layout.column_widths.insert(index, width);
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(reference) = attr(&element, b"ref") {
                        layout.merged_ranges.push(reference.parse()?);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_lists_sheets_in_order() {
        let xml = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<workbookPr date1904="1"/><sheets><sheet name="Data" sheetId="1" r:id="rId1"/><sheet name="总表" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let sheets = parse_workbook(xml.as_bytes()).unwrap();
        assert_eq!(
            sheets,
            vec![
                ("Data".to_string(), "rId1".to_string()),
                ("总表".to_string(), "rId2".to_string())
            ]
        );
    }

    #[test]
    fn worksheet_layout_collects_styles_dimensions_and_merges() {
        let xml = br#"<worksheet><cols><col min="1" max="2" width="20.5" customWidth="1"/><col min="4" max="4" style="3"/></cols>
<sheetData>
<row r="1" ht="30" customHeight="1"><c r="A1" s="2" t="s"><v>0</v></c><c r="B1"><v>5</v></c><c r="C1" s="4"/></row>
<row r="3"><c s="1"><v>1</v></c><c s="0"><v>2</v></c></row>
</sheetData>
<mergeCells count="1"><mergeCell ref="A1:C1"/></mergeCells></worksheet>"#;
        let layout = parse_worksheet(xml).unwrap();
        assert_eq!(layout.column_widths.get(&1), Some(&20.5));
        assert_eq!(layout.column_widths.get(&2), Some(&20.5));
        assert!(!layout.column_widths.contains_key(&4));
        assert_eq!(layout.row_heights.get(&1), Some(&30.0));
        assert!(!layout.row_heights.contains_key(&3));
        assert_eq!(layout.style_ids.get(&(1, 1)), Some(&2));
        assert_eq!(layout.style_ids.get(&(1, 3)), Some(&4));
        assert!(!layout.style_ids.contains_key(&(1, 2)));
        assert_eq!(layout.style_ids.get(&(3, 1)), Some(&1));
        assert!(!layout.style_ids.contains_key(&(3, 2)));
        assert_eq!(layout.merged_ranges, vec!["A1:C1".parse::<CellRange>().unwrap()]);
    }

    #[test]
    fn relationships_keep_type() {
        let xml = br#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let relationships = parse_relationships(xml).unwrap();
        let relationship = relationships.get("rId1").unwrap();
        assert_eq!(relationship.target, "worksheets/sheet1.xml");
        assert!(relationship.kind.ends_with(WORKSHEET_REL_SUFFIX));
    }
}
