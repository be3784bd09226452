//! Resolution of `xl/styles.xml` (plus the theme colour scheme) into owned
//! [`CellStyle`] values indexed by `cellXfs` position.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::aideon::consolidate::error::Result;
use crate::aideon::consolidate::io::xml::{attr, attr_f64, attr_flag, attr_u32};
use crate::aideon::consolidate::model::Styling;
use crate::aideon::consolidate::model::style::{
    Alignment, Border, BorderEdge, BorderLine, CellStyle, Fill, FillPattern, Font, FontScript,
    HorizontalAlign, NumberFormat, Protection, Rgb, Underline, VerticalAlign,
};

/// Default Office colour scheme in theme-index order
/// (lt1, dk1, lt2, dk2, accent1-6, hlink, folHlink).
const DEFAULT_THEME: [u32; 12] = [
    0xFFFFFF, 0x000000, 0xEEECE1, 0x1F497D, 0x4F81BD, 0xC0504D, 0x9BBB59, 0x8064A2, 0x4BACC6,
    0xF79646, 0x0000FF, 0x800080,
];

/// Legacy 64-entry indexed palette.
const DEFAULT_PALETTE: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, 0x000000,
    0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, 0x800000, 0x008000,
    0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, 0x9999FF, 0x993366, 0xFFFFCC,
    0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, 0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF,
    0x800080, 0x800000, 0x008080, 0x0000FF, 0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF,
    0xFF99CC, 0xCC99FF, 0xFFCC99, 0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600,
    0x666699, 0x969696, 0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399,
    0x333333,
];

/// Format code of a built-in number format id.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Theme colours and indexed palette used to turn colour references into RGB.
#[derive(Debug, Clone)]
pub struct ColorContext {
    theme: Vec<Rgb>,
    palette: Vec<Rgb>,
}

impl Default for ColorContext {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.iter().copied().map(Rgb).collect(),
            palette: DEFAULT_PALETTE.iter().copied().map(Rgb).collect(),
        }
    }
}

impl ColorContext {
    /// Builds the context from the optional theme part and styles part.
    pub fn from_parts(theme_xml: Option<&[u8]>, styles_xml: Option<&[u8]>) -> Result<Self> {
        let mut context = Self::default();
        if let Some(xml) = theme_xml {
            if let Some(theme) = parse_theme(xml)? {
                context.theme = theme;
            }
        }
        if let Some(xml) = styles_xml {
            let overrides = parse_indexed_colors(xml)?;
            for (index, color) in overrides.into_iter().enumerate() {
                if let Some(slot) = context.palette.get_mut(index) {
                    *slot = color;
                }
            }
        }
        Ok(context)
    }

    /// Resolves a `<color>`-like element (`rgb`, `theme`, `indexed`, `auto`,
    /// optional `tint`). Automatic and system colours resolve to `None`.
    fn resolve(&self, element: &BytesStart<'_>) -> Option<Rgb> {
        if attr_flag(element, b"auto", false) {
            return None;
        }
        let base = if let Some(hex) = attr(element, b"rgb") {
            Rgb::from_hex(&hex)?
        } else if let Some(index) = attr_u32(element, b"theme") {
            *self.theme.get(index as usize)?
        } else if let Some(index) = attr_u32(element, b"indexed") {
            *self.palette.get(index as usize)?
        } else {
            return None;
        };
        match attr_f64(element, b"tint") {
            Some(tint) if tint != 0.0 => Some(apply_tint(base, tint)),
            _ => Some(base),
        }
    }
}

/// Applies an OOXML tint: negative values darken, positive values lighten,
/// operating on HLS luminance.
pub fn apply_tint(color: Rgb, tint: f64) -> Rgb {
    let (hue, lightness, saturation) = rgb_to_hls(color);
    let lightness = if tint < 0.0 {
        lightness * (1.0 + tint)
    } else {
        lightness * (1.0 - tint) + tint
    };
    hls_to_rgb(hue, lightness.clamp(0.0, 1.0), saturation)
}

fn rgb_to_hls(color: Rgb) -> (f64, f64, f64) {
    let r = f64::from(color.red()) / 255.0;
    let g = f64::from(color.green()) / 255.0;
    let b = f64::from(color.blue()) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;
    if max == min {
        return (0.0, lightness, 0.0);
    }
    let delta = max - min;
    let saturation = if lightness <= 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };
    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let hue = sector / 6.0;
    (hue, lightness, saturation)
}

fn hls_to_rgb(hue: f64, lightness: f64, saturation: f64) -> Rgb {
    if saturation == 0.0 {
        let v = channel(lightness);
        return Rgb((v << 16) | (v << 8) | v);
    }
    let m2 = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let m1 = 2.0 * lightness - m2;
    let r = channel(hue_component(m1, m2, hue + 1.0 / 3.0));
    let g = channel(hue_component(m1, m2, hue));
    let b = channel(hue_component(m1, m2, hue - 1.0 / 3.0));
    Rgb((r << 16) | (g << 8) | b)
}

fn hue_component(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn channel(value: f64) -> u32 {
    (value * 255.0).round().clamp(0.0, 255.0) as u32
}

/// Reads the `a:clrScheme` of a theme part, reordered to theme-index order.
fn parse_theme(xml: &[u8]) -> Result<Option<Vec<Rgb>>> {
    const SLOTS: [&[u8]; 12] = [
        b"dk1", b"lt1", b"dk2", b"lt2", b"accent1", b"accent2", b"accent3", b"accent4",
        b"accent5", b"accent6", b"hlink", b"folHlink",
    ];
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut scheme: [Option<Rgb>; 12] = [None; 12];
    let mut in_scheme = false;
    let mut slot: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) | Event::Empty(element) => {
                let name = element.local_name();
                match name.as_ref() {
                    b"clrScheme" => in_scheme = true,
                    b"srgbClr" if in_scheme => {
                        if let (Some(index), Some(hex)) = (slot, attr(&element, b"val")) {
                            scheme[index] = Rgb::from_hex(&hex);
                        }
                    }
                    b"sysClr" if in_scheme => {
                        if let (Some(index), Some(hex)) = (slot, attr(&element, b"lastClr")) {
                            scheme[index] = Rgb::from_hex(&hex);
                        }
                    }
                    other if in_scheme => {
                        if let Some(index) = SLOTS.iter().position(|name| *name == other) {
                            slot = Some(index);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(element) => {
                if element.local_name().as_ref() == b"clrScheme" {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if scheme.iter().any(Option::is_none) {
        return Ok(None);
    }
    let mut colors: Vec<Rgb> = scheme.iter().flatten().copied().collect();
    // Theme indices list light before dark.
    colors.swap(0, 1);
    colors.swap(2, 3);
    Ok(Some(colors))
}

fn parse_indexed_colors(xml: &[u8]) -> Result<Vec<Rgb>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut colors = Vec::new();
    let mut in_indexed = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.local_name().as_ref() == b"indexedColors" => {
                in_indexed = true;
            }
            Event::Start(element) | Event::Empty(element)
                if in_indexed && element.local_name().as_ref() == b"rgbColor" =>
            {
                let color = attr(&element, b"rgb")
                    .and_then(|hex| Rgb::from_hex(&hex))
                    .unwrap_or(Rgb(0));
                colors.push(color);
            }
            Event::End(element) if element.local_name().as_ref() == b"indexedColors" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(colors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    NumberFormats,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Default, Clone, Copy)]
struct XfRefs {
    num_fmt: u32,
    font: u32,
    fill: u32,
    border: u32,
    alignment: Alignment,
    protection: Protection,
}

#[derive(Debug)]
struct StylesParser<'a> {
    colors: &'a ColorContext,
    section: Section,
    custom_formats: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    xfs: Vec<XfRefs>,
    font: Option<Font>,
    fill: Option<Fill>,
    border: Option<Border>,
    edge: Option<Vec<u8>>,
    xf: Option<XfRefs>,
}

impl<'a> StylesParser<'a> {
    fn new(colors: &'a ColorContext) -> Self {
        Self {
            colors,
            section: Section::Other,
            custom_formats: HashMap::new(),
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            xfs: Vec::new(),
            font: None,
            fill: None,
            border: None,
            edge: None,
            xf: None,
        }
    }

    fn open(&mut self, element: &BytesStart<'_>) {
        let name = element.local_name();
        let name = name.as_ref();
        if self.section == Section::Other {
            self.section = match name {
                b"numFmts" => Section::NumberFormats,
                b"fonts" => Section::Fonts,
                b"fills" => Section::Fills,
                b"borders" => Section::Borders,
                b"cellXfs" => Section::CellXfs,
                _ => Section::Other,
            };
            return;
        }
        match self.section {
            Section::NumberFormats => {
                if name == b"numFmt" {
                    if let (Some(id), Some(code)) =
                        (attr_u32(element, b"numFmtId"), attr(element, b"formatCode"))
                    {
                        self.custom_formats.insert(id, code);
                    }
                }
            }
            Section::Fonts => self.open_font_child(name, element),
            Section::Fills => self.open_fill_child(name, element),
            Section::Borders => self.open_border_child(name, element),
            Section::CellXfs => self.open_xf_child(name, element),
            Section::Other => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match (self.section, name) {
            (Section::NumberFormats, b"numFmts")
            | (Section::Fonts, b"fonts")
            | (Section::Fills, b"fills")
            | (Section::Borders, b"borders")
            | (Section::CellXfs, b"cellXfs") => self.section = Section::Other,
            (Section::Fonts, b"font") => {
                if let Some(font) = self.font.take() {
                    self.fonts.push(font);
                }
            }
            (Section::Fills, b"fill") => {
                if let Some(fill) = self.fill.take() {
                    self.fills.push(fill);
                }
            }
            (Section::Borders, b"border") => {
                if let Some(border) = self.border.take() {
                    self.borders.push(border);
                }
            }
            (Section::Borders, edge) if self.edge.as_deref() == Some(edge) => self.edge = None,
            (Section::CellXfs, b"xf") => {
                if let Some(xf) = self.xf.take() {
                    self.xfs.push(xf);
                }
            }
            _ => {}
        }
    }

    fn open_font_child(&mut self, name: &[u8], element: &BytesStart<'_>) {
        if name == b"font" {
            self.font = Some(Font::default());
            return;
        }
        let Some(font) = self.font.as_mut() else {
            return;
        };
        match name {
            b"b" => font.bold = attr_flag(element, b"val", true),
            b"i" => font.italic = attr_flag(element, b"val", true),
            b"strike" => font.strikethrough = attr_flag(element, b"val", true),
            b"u" => font.underline = Underline::from_ooxml(attr(element, b"val").as_deref()),
            b"sz" => font.size = attr_f64(element, b"val"),
            b"name" => font.name = attr(element, b"val"),
            b"vertAlign" => {
                font.script = attr(element, b"val")
                    .map(|value| FontScript::from_ooxml(&value))
                    .unwrap_or_default();
            }
            b"color" => font.color = self.colors.resolve(element),
            _ => {}
        }
    }

    fn open_fill_child(&mut self, name: &[u8], element: &BytesStart<'_>) {
        if name == b"fill" {
            self.fill = Some(Fill::default());
            return;
        }
        let Some(fill) = self.fill.as_mut() else {
            return;
        };
        match name {
            b"patternFill" => {
                fill.pattern = attr(element, b"patternType")
                    .map(|value| FillPattern::from_ooxml(&value))
                    .unwrap_or(FillPattern::None);
            }
            b"fgColor" => fill.foreground = self.colors.resolve(element),
            b"bgColor" => fill.background = self.colors.resolve(element),
            _ => {}
        }
    }

    fn open_border_child(&mut self, name: &[u8], element: &BytesStart<'_>) {
        if name == b"border" {
            self.border = Some(Border {
                diagonal_up: attr_flag(element, b"diagonalUp", false),
                diagonal_down: attr_flag(element, b"diagonalDown", false),
                ..Border::default()
            });
            return;
        }
        let colors = self.colors;
        let Some(border) = self.border.as_mut() else {
            return;
        };
        if name == b"color" {
            let color = colors.resolve(element);
            if let Some(edge) = self.edge.as_deref().and_then(|edge| edge_mut(border, edge)) {
                edge.color = color;
            }
            return;
        }
        if let Some(edge) = edge_mut(border, name) {
            *edge = BorderEdge {
                line: attr(element, b"style")
                    .map(|value| BorderLine::from_ooxml(&value))
                    .unwrap_or_default(),
                color: None,
            };
            self.edge = Some(name.to_vec());
        }
    }

    fn open_xf_child(&mut self, name: &[u8], element: &BytesStart<'_>) {
        if name == b"xf" {
            self.xf = Some(XfRefs {
                num_fmt: attr_u32(element, b"numFmtId").unwrap_or(0),
                font: attr_u32(element, b"fontId").unwrap_or(0),
                fill: attr_u32(element, b"fillId").unwrap_or(0),
                border: attr_u32(element, b"borderId").unwrap_or(0),
                ..XfRefs::default()
            });
            return;
        }
        let Some(xf) = self.xf.as_mut() else {
            return;
        };
        match name {
            b"alignment" => {
                xf.alignment = Alignment {
                    horizontal: attr(element, b"horizontal")
                        .map(|value| HorizontalAlign::from_ooxml(&value))
                        .unwrap_or_default(),
                    vertical: attr(element, b"vertical")
                        .map(|value| VerticalAlign::from_ooxml(&value))
                        .unwrap_or_default(),
                    wrap_text: attr_flag(element, b"wrapText", false),
                    shrink_to_fit: attr_flag(element, b"shrinkToFit", false),
                    indent: attr_u32(element, b"indent")
                        .map(|value| value.min(u32::from(u8::MAX)) as u8)
                        .unwrap_or(0),
                    rotation: attr_u32(element, b"textRotation")
                        .map(|value| value.min(255) as u16)
                        .unwrap_or(0),
                };
            }
            b"protection" => {
                xf.protection = Protection {
                    locked: attr_flag(element, b"locked", true),
                    hidden: attr_flag(element, b"hidden", false),
                };
            }
            _ => {}
        }
    }

    fn resolve(&self, xf: &XfRefs) -> std::result::Result<CellStyle, String> {
        let font = self
            .fonts
            .get(xf.font as usize)
            .cloned()
            .ok_or_else(|| format!("font #{} is not defined", xf.font))?;
        let fill = self
            .fills
            .get(xf.fill as usize)
            .copied()
            .ok_or_else(|| format!("fill #{} is not defined", xf.fill))?;
        let border = self
            .borders
            .get(xf.border as usize)
            .copied()
            .ok_or_else(|| format!("border #{} is not defined", xf.border))?;
        let code = match self.custom_formats.get(&xf.num_fmt) {
            Some(code) => code.clone(),
            None => match builtin_format_code(xf.num_fmt) {
                Some(code) => code.to_string(),
                // Locale-specific built-ins (e.g. 27-36 in CJK locales) keep
                // their id and are written back by index.
                None if xf.num_fmt < NumberFormat::FIRST_CUSTOM_ID => "General".to_string(),
                None => return Err(format!("number format #{} is not defined", xf.num_fmt)),
            },
        };
        Ok(CellStyle {
            font,
            border,
            fill,
            number_format: NumberFormat {
                id: xf.num_fmt,
                code,
            },
            protection: xf.protection,
            alignment: xf.alignment,
        })
    }
}

fn edge_mut<'b>(border: &'b mut Border, name: &[u8]) -> Option<&'b mut BorderEdge> {
    match name {
        b"left" | b"start" => Some(&mut border.left),
        b"right" | b"end" => Some(&mut border.right),
        b"top" => Some(&mut border.top),
        b"bottom" => Some(&mut border.bottom),
        b"diagonal" => Some(&mut border.diagonal),
        _ => None,
    }
}

/// Resolved `cellXfs` table of one workbook.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    entries: Vec<std::result::Result<CellStyle, String>>,
}

impl StyleTable {
    /// Parses `styles.xml`, resolving colours through `colors`.
    pub fn parse(xml: &[u8], colors: &ColorContext) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut parser = StylesParser::new(colors);

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(element) => parser.open(&element),
                Event::Empty(element) => {
                    parser.open(&element);
                    parser.close(element.local_name().as_ref());
                }
                Event::End(element) => parser.close(element.local_name().as_ref()),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let entries = parser.xfs.iter().map(|xf| parser.resolve(xf)).collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Styling for a cell's `s` attribute. Index 0 (or none) is the
    /// workbook default and therefore unstyled.
    pub fn styling_for(&self, style_id: Option<u32>) -> Styling {
        let style_id = match style_id {
            None | Some(0) => return Styling::Default,
            Some(id) => id,
        };
        match self.entries.get(style_id as usize) {
            Some(Ok(style)) => Styling::Explicit(Box::new(style.clone())),
            Some(Err(reason)) => Styling::Malformed {
                style_id,
                reason: reason.clone(),
            },
            None => Styling::Malformed {
                style_id,
                reason: format!("cellXfs defines {} entries", self.entries.len()),
            },
        }
    }
}
